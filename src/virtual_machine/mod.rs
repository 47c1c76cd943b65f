//! Intcode virtual machine.
//!
//! An Intcode program is a list of signed 64-bit integers that is loaded as
//! the machine's initial memory and executed in place.
//!
//! # Architecture
//!
//! - **Memory**: sparse and unbounded; unwritten cells read as zero
//! - **Registers**: only the instruction pointer and the relative base
//! - **Instruction format**: `word % 100` selects the operation, the digits
//!   above it give one addressing mode per parameter (position, immediate,
//!   relative)
//! - **Execution model**: [`vm::VM::resume`] runs until the program halts or
//!   blocks on input; the host feeds more input and resumes
//! - **I/O**: pluggable [`io::InputSource`] / [`io::OutputSink`] channels,
//!   including blocking inter-thread queues for multi-machine pipelines
//!
//! # Modules
//!
//! - [`errors`]: Fault kinds and program loading errors
//! - [`io`]: Input and output channels
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`operand`]: Parameter modes and opcode-word decoding
//! - [`pipeline`]: Machines chained output to input on separate threads
//! - [`program`]: Program text parsing, rendering and disassembly
//! - [`vm`]: Core virtual machine implementation

pub mod errors;
pub mod io;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod pipeline;
pub mod program;
pub mod vm;
