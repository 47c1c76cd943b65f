//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the Intcode instruction set. The [`for_each_instruction!`](crate::for_each_instruction)
//! macro holds the canonical instruction definitions and invokes a callback
//! macro for code generation, so the opcode table lives in exactly one place.
//!
//! This module generates:
//! - The [`Instruction`] enum with opcode mappings
//! - `TryFrom<i64>` for decoding base operations
//! - Mnemonics and per-parameter access kinds used by the decoder and the
//!   disassembler
//!
//! # Word Format
//!
//! Every instruction starts with one opcode word followed by its parameters:
//! - Base operation: `word % 100`
//! - Mode of parameter `k` (1-based): `(word / 10^(k+1)) % 10`
//!
//! See [`operand`](super::operand) for mode decoding.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::operand::Access;

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// ADD a, b, dst ; dst = a + b
            Add = 1, "ADD" => [a: Src, b: Src, dst: Dst],
            /// MUL a, b, dst ; dst = a * b
            Mul = 2, "MUL" => [a: Src, b: Src, dst: Dst],
            /// IN dst ; dst = next input value, suspends when none is available
            Input = 3, "IN" => [dst: Dst],
            /// OUT a ; emit a on the output channel
            Output = 4, "OUT" => [a: Src],
            /// JT a, target ; if a != 0 then ip = target
            JumpIfTrue = 5, "JT" => [a: Src, target: Src],
            /// JF a, target ; if a == 0 then ip = target
            JumpIfFalse = 6, "JF" => [a: Src, target: Src],
            /// LT a, b, dst ; dst = (a < b) as 0/1
            LessThan = 7, "LT" => [a: Src, b: Src, dst: Dst],
            /// EQ a, b, dst ; dst = (a == b) as 0/1
            Equals = 8, "EQ" => [a: Src, b: Src, dst: Dst],
            /// ARB a ; relative_base += a
            AdjustBase = 9, "ARB" => [a: Src],
            /// HALT ; stop execution for good
            Halt = 99, "HALT" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<i64> for Instruction {
            type Error = VMError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Instruction::$name), )*
                    _ => Err(VMError::InvalidOpcode { opcode: value }),
                }
            }
        }

        impl Instruction {
            /// Every instruction, in opcode order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name, )* ];

            /// Returns the mnemonic used by the disassembler.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Returns how each parameter is accessed, in parameter order.
            pub const fn params(&self) -> &'static [Access] {
                match self {
                    $( Instruction::$name => &[ $( Access::$kind ),* ], )*
                }
            }
        }
    };
}

for_each_instruction!(define_instructions);

impl Instruction {
    /// Number of parameter words following the opcode word.
    pub const fn arity(&self) -> usize {
        self.params().len()
    }

    /// Total number of words the instruction occupies.
    pub const fn width(&self) -> u64 {
        1 + self.arity() as u64
    }
}
