//! Derive macros for the intcode crate.
//!
//! Provides `#[derive(Error)]`, which generates `Display` and
//! `std::error::Error` for the VM, pipeline and CLI error types.

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` from `#[error("...")]` attributes.
///
/// Single-field tuple variants may mark their field `#[from]` to also get a
/// `From` conversion and a `source()` link.
#[proc_macro_derive(Error, attributes(error, from))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
