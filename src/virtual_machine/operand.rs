//! Parameter modes and opcode-word decoding.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;

/// Largest number of parameters any instruction takes.
pub const MAX_PARAMS: usize = 3;

/// How an instruction uses one of its parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Access {
    /// Parameter is read as a value.
    Src,
    /// Parameter names the address the result is written to.
    Dst,
}

/// Addressing mode of a single parameter.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Mode {
    /// The parameter word is an address.
    #[default]
    Position = 0,
    /// The parameter word is the value itself.
    Immediate = 1,
    /// The parameter word is an offset from the relative base.
    Relative = 2,
}

impl Mode {
    /// Maps a mode digit of parameter `parameter` (1-based) to a [`Mode`].
    pub fn from_digit(digit: i64, parameter: usize) -> Result<Self, VMError> {
        match digit {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            mode => Err(VMError::InvalidMode { mode, parameter }),
        }
    }
}

/// A parameter as it appears in memory: the raw word and its mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Parameter {
    pub raw: i64,
    pub mode: Mode,
}

/// An opcode word split into its base operation and parameter modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decoded {
    pub instruction: Instruction,
    /// Modes for parameters `1..=arity`; unused slots hold [`Mode::Position`].
    pub modes: [Mode; MAX_PARAMS],
}

impl Decoded {
    /// Splits `word` into a base operation and the modes of its parameters.
    ///
    /// Only the digits for parameters the instruction actually takes are
    /// checked; higher digits are ignored. Destination parameters in
    /// immediate mode are rejected here, before anything executes.
    pub fn from_word(word: i64) -> Result<Self, VMError> {
        let instruction = Instruction::try_from(word % 100)?;
        let mut modes = [Mode::Position; MAX_PARAMS];
        let mut divisor = 100;

        for (k, access) in instruction.params().iter().enumerate() {
            let parameter = k + 1;
            let mode = Mode::from_digit((word / divisor) % 10, parameter)?;
            if *access == Access::Dst && mode == Mode::Immediate {
                return Err(VMError::InvalidWriteMode { parameter });
            }
            modes[k] = mode;
            divisor *= 10;
        }

        Ok(Self { instruction, modes })
    }
}
