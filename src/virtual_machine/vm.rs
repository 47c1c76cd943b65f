//! Core virtual machine implementation.
//!
//! The VM executes Intcode directly out of its own memory: there are no
//! registers besides the instruction pointer and the relative base. All
//! arithmetic uses wrapping semantics so overflow never panics.
//!
//! # Execution model
//!
//! [`VM::resume`] runs instructions until the program halts or an input
//! instruction finds no value available. In the second case the machine
//! suspends with the instruction pointer still on the input instruction,
//! and the next call retries it. Outputs are handed to the attached sink as
//! they are produced, inside the same call.

mod memory;

use crate::virtual_machine::errors::{Fault, VMError};
use crate::virtual_machine::io::{InputSource, OutputSink};
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::operand::{Decoded, Mode, Parameter};
use crate::virtual_machine::program::Program;
use std::collections::VecDeque;
use std::fmt::{self, Display};

pub use memory::Memory;

/// Lifecycle of a machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// Ready to execute, or executing.
    Running,
    /// Suspended on an input instruction.
    AwaitingInput,
    /// Executed `HALT`. Terminal.
    Halted,
    /// Raised a fatal error. Terminal.
    Faulted,
}

/// Why [`VM::resume`] returned without an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitReason {
    /// The program halted.
    Terminated,
    /// An input instruction found no value; resume again once one is available.
    NeedsInput,
}

/// What an executed instruction does to the instruction pointer.
enum Flow {
    /// Continue with the following instruction.
    Next,
    /// Continue at the given address.
    Jump(u64),
    /// Stay on this instruction and suspend.
    Suspend,
    /// Stop for good.
    Halt,
}

macro_rules! exec_vm {
    (
        vm = $vm:ident,
        decoded = $decoded:ident,
        { $( $variant:ident => $handler:ident ( $( $field:ident : $kind:ident @ $index:literal ),* $(,)? ) ),* $(,)? }
    ) => {{
        match $decoded.instruction {
            $(
                Instruction::$variant => {
                    $(
                        let $field = exec_vm!(@read $vm, $decoded, $index, $kind)?;
                    )*
                    $vm.$handler($( $field ),*)
                }
            ),*
        }
    }};

    // Resolve parameter `$index` (0-based) to the value it denotes
    (@read $vm:ident, $decoded:ident, $index:literal, Src) => {{
        $vm.value_of($vm.parameter(&$decoded, $index))
    }};

    // Resolve parameter `$index` (0-based) to the address it names
    (@read $vm:ident, $decoded:ident, $index:literal, Dst) => {{
        $vm.address_of($vm.parameter(&$decoded, $index), $index + 1)
    }};
}

/// Intcode virtual machine.
///
/// `I` and `O` are the attached input and output channels. The defaults are
/// in-memory queues, which suit a host that drives the machine itself:
///
/// ```
/// use intcode::virtual_machine::vm::{ExitReason, VM};
///
/// let mut vm = VM::from_text("3,9,8,9,10,9,4,9,99,-1,8").unwrap();
/// assert_eq!(vm.resume(), Ok(ExitReason::NeedsInput));
/// vm.input_mut().push_back(8);
/// assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
/// assert_eq!(vm.output(), &vec![1]);
/// ```
pub struct VM<I = VecDeque<i64>, O = Vec<i64>> {
    /// Program memory.
    memory: Memory,
    /// Address of the next instruction's opcode word.
    ip: u64,
    /// Offset applied to relative-mode parameters.
    relative_base: i64,
    status: Status,
    /// Instructions executed so far.
    steps: u64,
    input: I,
    output: O,
}

impl VM {
    /// Creates a machine with queue-backed input and output.
    pub fn new(program: &Program) -> Self {
        Self::with_io(program, VecDeque::new(), Vec::new())
    }

    /// Parses `text` and creates a machine with queue-backed input and output.
    pub fn from_text(text: &str) -> Result<Self, VMError> {
        Ok(Self::new(&text.parse()?))
    }

    /// Queues input values.
    pub fn feed<T: IntoIterator<Item = i64>>(&mut self, values: T) {
        self.input.extend(values);
    }

    /// Takes every output value produced so far.
    pub fn take_output(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.output)
    }

    /// Runs `program` on `inputs` and returns why it stopped and what it wrote.
    ///
    /// A program that asks for more input than given stops with
    /// [`ExitReason::NeedsInput`]; the outputs produced up to then are kept.
    pub fn run_with(program: &Program, inputs: &[i64]) -> Result<(ExitReason, Vec<i64>), Fault> {
        let mut vm = Self::new(program);
        vm.feed(inputs.iter().copied());
        let reason = vm.resume()?;
        Ok((reason, vm.take_output()))
    }
}

impl<I, O> VM<I, O> {
    /// Creates a machine with the given input and output channels.
    pub fn with_io(program: &Program, input: I, output: O) -> Self {
        Self {
            memory: Memory::new(program.words()),
            ip: 0,
            relative_base: 0,
            status: Status::Running,
            steps: 0,
            input,
            output,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Address of the next instruction.
    pub fn ip(&self) -> u64 {
        self.ip
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    /// Number of instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Reads memory at `address` from the host side.
    pub fn peek(&self, address: i64) -> Result<i64, VMError> {
        self.memory.read(address)
    }

    /// Writes memory at `address` from the host side, e.g. to patch a program
    /// before running it.
    pub fn poke(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        self.memory.write(address, value)
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Consumes the machine and returns its channels.
    pub fn into_io(self) -> (I, O) {
        (self.input, self.output)
    }

    /// Renders memory as `[v0,...,vk]`, `k` being the highest written address.
    pub fn render(&self) -> String {
        self.memory.to_string()
    }
}

impl<I: InputSource, O: OutputSink> VM<I, O> {
    /// Runs until the program halts or needs input that is not available.
    ///
    /// Calling `resume` on a halted machine returns
    /// [`ExitReason::Terminated`] without executing anything. A fault stops
    /// execution immediately; every later call returns [`VMError::Faulted`].
    pub fn resume(&mut self) -> Result<ExitReason, Fault> {
        loop {
            if let Some(reason) = self.step()? {
                return Ok(reason);
            }
        }
    }

    /// Executes a single instruction.
    ///
    /// Returns `Some` when the machine stops (halt or suspension), `None`
    /// when it is ready for the next instruction.
    pub fn step(&mut self) -> Result<Option<ExitReason>, Fault> {
        match self.status {
            Status::Halted => return Ok(Some(ExitReason::Terminated)),
            Status::Faulted => {
                return Err(Fault {
                    ip: self.ip,
                    error: VMError::Faulted,
                });
            }
            Status::Running | Status::AwaitingInput => {}
        }

        self.status = Status::Running;
        let flow = self.execute().map_err(|error| {
            self.status = Status::Faulted;
            Fault { ip: self.ip, error }
        })?;

        match flow {
            Flow::Suspend => {
                self.status = Status::AwaitingInput;
                Ok(Some(ExitReason::NeedsInput))
            }
            Flow::Halt => {
                self.steps += 1;
                self.status = Status::Halted;
                Ok(Some(ExitReason::Terminated))
            }
            Flow::Next | Flow::Jump(_) => {
                self.steps += 1;
                Ok(None)
            }
        }
    }

    /// Decodes and executes the instruction at `ip`, then moves `ip`.
    ///
    /// `ip` is left untouched when this returns an error or suspends.
    fn execute(&mut self) -> Result<Flow, VMError> {
        let word = self.memory.read(self.word_address(0)?)?;
        let decoded = Decoded::from_word(word)?;

        let flow = exec_vm! {
            vm = self,
            decoded = decoded,
            {
                Add => op_add(a: Src @ 0, b: Src @ 1, dst: Dst @ 2),
                Mul => op_mul(a: Src @ 0, b: Src @ 1, dst: Dst @ 2),
                Input => op_input(dst: Dst @ 0),
                Output => op_output(a: Src @ 0),
                JumpIfTrue => op_jump_if_true(a: Src @ 0, target: Src @ 1),
                JumpIfFalse => op_jump_if_false(a: Src @ 0, target: Src @ 1),
                LessThan => op_less_than(a: Src @ 0, b: Src @ 1, dst: Dst @ 2),
                Equals => op_equals(a: Src @ 0, b: Src @ 1, dst: Dst @ 2),
                AdjustBase => op_adjust_base(a: Src @ 0),
                Halt => op_halt(),
            }
        }?;

        match flow {
            Flow::Next => self.ip += decoded.instruction.width(),
            Flow::Jump(target) => self.ip = target,
            Flow::Suspend | Flow::Halt => {}
        }
        Ok(flow)
    }

    /// Address `offset` words past the current instruction pointer.
    fn word_address(&self, offset: u64) -> Result<i64, VMError> {
        let address = self.ip.wrapping_add(offset);
        i64::try_from(address).map_err(|_| VMError::InvalidAddress {
            address: address as i64,
        })
    }

    /// Fetches parameter `index` (0-based) of the current instruction.
    fn parameter(&self, decoded: &Decoded, index: usize) -> Result<Parameter, VMError> {
        let raw = self.memory.read(self.word_address(1 + index as u64)?)?;
        Ok(Parameter {
            raw,
            mode: decoded.modes[index],
        })
    }

    /// Resolves a source parameter to its value.
    fn value_of(&self, param: Result<Parameter, VMError>) -> Result<i64, VMError> {
        let param = param?;
        match param.mode {
            Mode::Position => self.memory.read(param.raw),
            Mode::Immediate => Ok(param.raw),
            Mode::Relative => self
                .memory
                .read(self.relative_base.wrapping_add(param.raw)),
        }
    }

    /// Resolves destination parameter `index` (1-based) to the address it names.
    ///
    /// The address is validated here so that an instruction never consumes
    /// input it cannot store.
    fn address_of(&self, param: Result<Parameter, VMError>, index: usize) -> Result<i64, VMError> {
        let param = param?;
        let address = match param.mode {
            Mode::Position => param.raw,
            Mode::Relative => self.relative_base.wrapping_add(param.raw),
            Mode::Immediate => return Err(VMError::InvalidWriteMode { parameter: index }),
        };
        if address < 0 {
            return Err(VMError::InvalidAddress { address });
        }
        Ok(address)
    }

    fn jump_target(target: i64) -> Result<u64, VMError> {
        u64::try_from(target).map_err(|_| VMError::InvalidAddress { address: target })
    }

    fn op_add(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.memory.write(dst, a.wrapping_add(b))?;
        Ok(Flow::Next)
    }

    fn op_mul(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.memory.write(dst, a.wrapping_mul(b))?;
        Ok(Flow::Next)
    }

    fn op_input(&mut self, dst: i64) -> Result<Flow, VMError> {
        match self.input.next() {
            Some(value) => {
                self.memory.write(dst, value)?;
                Ok(Flow::Next)
            }
            None => Ok(Flow::Suspend),
        }
    }

    fn op_output(&mut self, a: i64) -> Result<Flow, VMError> {
        self.output.send(a);
        Ok(Flow::Next)
    }

    fn op_jump_if_true(&mut self, a: i64, target: i64) -> Result<Flow, VMError> {
        if a != 0 {
            return Ok(Flow::Jump(Self::jump_target(target)?));
        }
        Ok(Flow::Next)
    }

    fn op_jump_if_false(&mut self, a: i64, target: i64) -> Result<Flow, VMError> {
        if a == 0 {
            return Ok(Flow::Jump(Self::jump_target(target)?));
        }
        Ok(Flow::Next)
    }

    fn op_less_than(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.memory.write(dst, i64::from(a < b))?;
        Ok(Flow::Next)
    }

    fn op_equals(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.memory.write(dst, i64::from(a == b))?;
        Ok(Flow::Next)
    }

    fn op_adjust_base(&mut self, a: i64) -> Result<Flow, VMError> {
        self.relative_base = self.relative_base.wrapping_add(a);
        Ok(Flow::Next)
    }

    fn op_halt(&mut self) -> Result<Flow, VMError> {
        Ok(Flow::Halt)
    }
}

/// Same as [`VM::render`].
impl<I, O> Display for VM<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.memory, f)
    }
}

impl<I, O> fmt::Debug for VM<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VM")
            .field("ip", &self.ip)
            .field("relative_base", &self.relative_base)
            .field("status", &self.status)
            .field("steps", &self.steps)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
