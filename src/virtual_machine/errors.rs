use intcode_derive::Error;

/// Errors raised while decoding, executing or loading Intcode programs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum VMError {
    /// Memory access at a negative address.
    #[error("invalid address {address}")]
    InvalidAddress { address: i64 },
    /// Base operation (`word % 100`) is not part of the instruction set.
    #[error("invalid opcode {opcode}")]
    InvalidOpcode { opcode: i64 },
    /// Parameter mode digit outside {0, 1, 2}.
    #[error("invalid mode {mode} for parameter {parameter}")]
    InvalidMode { mode: i64, parameter: usize },
    /// Destination parameter encoded in immediate mode.
    #[error("parameter {parameter} is a write target and cannot be immediate")]
    InvalidWriteMode { parameter: usize },
    /// The machine already faulted and cannot be resumed.
    #[error("machine has faulted and cannot be resumed")]
    Faulted,
    /// Program text contained no values.
    #[error("empty program")]
    EmptyProgram,
    /// Program text contained a token that is not a signed decimal integer.
    #[error("invalid program value {token:?} at index {index}")]
    InvalidProgramText { index: usize, token: String },
    /// Reading program text from disk failed.
    #[error("io error reading {path}: {source}")]
    IoError { path: String, source: String },
}

/// A fatal error together with the instruction pointer it was raised at.
///
/// Returned by [`VM::resume`](super::vm::VM::resume). Once a machine has
/// produced a fault it stays faulted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("fault at ip {ip}: {error}")]
pub struct Fault {
    /// Address of the faulting instruction's opcode word.
    pub ip: u64,
    /// What went wrong.
    pub error: VMError,
}
