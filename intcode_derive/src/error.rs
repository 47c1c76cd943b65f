//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! # Usage
//!
//! ```ignore
//! use intcode_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum RunError {
//!     #[error("invalid opcode {opcode}")]
//!     InvalidOpcode { opcode: i64 },
//!
//!     #[error("io error: {0}")]
//!     Io(#[from] std::io::Error),
//!
//!     #[error("program halted")]
//!     Halted,
//! }
//! ```
//!
//! # Supported Features
//!
//! - Unit variants: `#[error("message")]`
//! - Tuple variants with positional args: `#[error("error: {0}")]`
//! - Struct variants and structs with named args: `#[error("expected {expected}")]`
//! - `#[from]` on the only field of a tuple variant: `From` impl plus `source()`
//!
//! Fields not mentioned in the message are left out of the generated
//! `write!` call, so a message may reference any subset of them.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    match &input.data {
        Data::Enum(data_enum) => {
            let mut display_arms = Vec::new();
            let mut source_arms = Vec::new();
            let mut from_impls = Vec::new();

            for variant in &data_enum.variants {
                let variant_name = &variant.ident;
                let message = extract_error_message(
                    &variant.attrs,
                    variant_name,
                    &format!("variant `{variant_name}`"),
                )?;
                display_arms.push(display_arm(variant_name, &variant.fields, &message));

                if let Some(ty) = from_field(&variant.fields)? {
                    source_arms.push(quote! {
                        Self::#variant_name(inner) => ::core::option::Option::Some(inner),
                    });
                    from_impls.push(quote! {
                        impl #impl_generics ::core::convert::From<#ty> for #name #ty_generics #where_clause {
                            fn from(inner: #ty) -> Self {
                                Self::#variant_name(inner)
                            }
                        }
                    });
                }
            }

            let source_fn = if source_arms.is_empty() {
                quote! {}
            } else {
                quote! {
                    fn source(&self) -> ::core::option::Option<&(dyn ::std::error::Error + 'static)> {
                        #[allow(unreachable_patterns)]
                        match self {
                            #(#source_arms)*
                            _ => ::core::option::Option::None,
                        }
                    }
                }
            };

            Ok(quote! {
                impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        match self {
                            #(#display_arms)*
                        }
                    }
                }

                impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {
                    #source_fn
                }

                #(#from_impls)*
            })
        }
        Data::Struct(data_struct) => {
            let message =
                extract_error_message(&input.attrs, name, &format!("type `{name}`"))?;
            let display_body = match &data_struct.fields {
                Fields::Unit => quote! { write!(f, #message) },
                Fields::Named(fields) => {
                    let used: Vec<_> = fields
                        .named
                        .iter()
                        .filter_map(|field| field.ident.as_ref())
                        .filter(|ident| mentions(&message, &ident.to_string()))
                        .collect();
                    quote! { write!(f, #message, #(#used = self.#used),*) }
                }
                Fields::Unnamed(fields) => {
                    let format_str = positional_to_named(&message, fields.unnamed.len());
                    let (idents, indices): (Vec<_>, Vec<_>) = (0..fields.unnamed.len())
                        .filter(|i| mentions(&message, &i.to_string()))
                        .map(|i| (format_ident!("f{}", i), syn::Index::from(i)))
                        .unzip();
                    quote! { write!(f, #format_str, #(#idents = self.#indices),*) }
                }
            };

            Ok(quote! {
                impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        #display_body
                    }
                }

                impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
            })
        }
        Data::Union(_) => Err(syn::Error::new_spanned(
            input,
            "Error derive does not support unions",
        )),
    }
}

/// Builds one `match` arm of the generated `Display` impl.
fn display_arm(variant: &syn::Ident, fields: &Fields, message: &str) -> TokenStream2 {
    match fields {
        Fields::Unit => quote! {
            Self::#variant => write!(f, #message),
        },
        Fields::Unnamed(fields) => {
            let format_str = positional_to_named(message, fields.unnamed.len());
            let mut pattern = Vec::new();
            let mut used = Vec::new();
            for i in 0..fields.unnamed.len() {
                if mentions(message, &i.to_string()) {
                    let ident = format_ident!("f{}", i);
                    pattern.push(ident.to_token_stream());
                    used.push(ident);
                } else {
                    pattern.push(quote! { _ });
                }
            }
            quote! {
                Self::#variant(#(#pattern),*) => write!(f, #format_str, #(#used = #used),*),
            }
        }
        Fields::Named(fields) => {
            let used: Vec<_> = fields
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| mentions(message, &ident.to_string()))
                .collect();
            quote! {
                Self::#variant { #(#used,)* .. } => write!(f, #message, #(#used = #used),*),
            }
        }
    }
}

/// Returns the type of a `#[from]` field, if the variant declares one.
fn from_field(fields: &Fields) -> syn::Result<Option<&syn::Type>> {
    let marked = |field: &syn::Field| field.attrs.iter().any(|a| a.path().is_ident("from"));

    match fields {
        Fields::Unnamed(unnamed) => {
            let Some(field) = unnamed.unnamed.iter().find(|f| marked(f)) else {
                return Ok(None);
            };
            if unnamed.unnamed.len() != 1 {
                return Err(syn::Error::new_spanned(
                    field,
                    "#[from] is only supported on variants with exactly one field",
                ));
            }
            Ok(Some(&field.ty))
        }
        Fields::Named(named) => match named.named.iter().find(|f| marked(f)) {
            Some(field) => Err(syn::Error::new_spanned(
                field,
                "#[from] is only supported on tuple variants, e.g. Io(#[from] std::io::Error)",
            )),
            None => Ok(None),
        },
        Fields::Unit => Ok(None),
    }
}

/// Extracts the message from an `#[error("...")]` attribute.
fn extract_error_message<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!(
                "missing #[error(\"...\")] attribute on {target_desc}; every error variant must declare a display message"
            ),
        ));
    };

    let Meta::List(meta_list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute; use #[error(\"message\")] to describe the error",
        ));
    };

    match syn::parse2::<Lit>(meta_list.tokens.clone()) {
        Ok(Lit::Str(lit_str)) => Ok(lit_str.value()),
        Ok(_) => Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute: message must be a string literal, e.g. #[error(\"invalid opcode: {0}\")]",
        )),
        Err(_) => Err(syn::Error::new_spanned(
            &attr.meta,
            "failed to parse #[error] attribute; expected a string literal like #[error(\"fault at ip {ip}\")]",
        )),
    }
}

/// Whether `message` interpolates the argument `name`, with or without a format spec.
fn mentions(message: &str, name: &str) -> bool {
    message.contains(&format!("{{{name}}}")) || message.contains(&format!("{{{name}:"))
}

/// Converts positional format args `{0}`, `{1}` to named args `{f0}`, `{f1}`.
fn positional_to_named(format_str: &str, field_count: usize) -> String {
    let mut result = format_str.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}
