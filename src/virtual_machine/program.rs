//! Intcode program representation, text parsing and disassembly.
//!
//! A [`Program`] is the initial memory image of a machine. Its text form is a
//! single line of comma-separated signed decimal integers:
//!
//! ```text
//! 1,9,10,3,2,3,11,0,99,30,40,50
//! ```
//!
//! Whitespace around the line and around individual values is ignored.
//! [`Display`] writes the same comma-separated form back.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::operand::{Decoded, Mode};
use std::fmt::{self, Display, Write};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Initial memory image of an Intcode machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Program(Vec<i64>);

impl Program {
    /// Wraps already-parsed program words.
    pub fn new(words: Vec<i64>) -> Self {
        Self(words)
    }

    /// Reads and parses a program text file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path_ref = path.as_ref();
        let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
            path: path_ref.display().to_string(),
            source: e.to_string(),
        })?;
        source.parse()
    }

    /// The program words, starting at address 0.
    pub fn words(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Program {
    type Err = VMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VMError::EmptyProgram);
        }
        s.split(',')
            .enumerate()
            .map(|(index, token)| {
                token
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| VMError::InvalidProgramText {
                        index,
                        token: token.trim().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Program)
    }
}

impl From<Vec<i64>> for Program {
    fn from(words: Vec<i64>) -> Self {
        Self(words)
    }
}

impl From<&[i64]> for Program {
    fn from(words: &[i64]) -> Self {
        Self(words.to_vec())
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{word}")?;
        }
        Ok(())
    }
}

/// Produces a listing of `program`, one instruction per line.
///
/// Parameters are shown as `[n]` (position), `n` (immediate) or `[rb+n]`
/// (relative). Words that do not decode, or instructions that would run past
/// the end of the program, are listed as `DATA`.
pub fn disassemble(program: &Program) -> String {
    let words = program.words();
    let mut out = String::new();
    let mut addr = 0usize;

    while addr < words.len() {
        let decoded = Decoded::from_word(words[addr])
            .ok()
            .filter(|d| addr + d.instruction.arity() < words.len());

        match decoded {
            Some(Decoded { instruction, modes }) => {
                let _ = write!(out, "{addr:>5}: {:<4}", instruction.mnemonic());
                let params = &words[addr + 1..addr + 1 + instruction.arity()];
                for (k, (&raw, mode)) in params.iter().zip(modes).enumerate() {
                    let sep = if k == 0 { " " } else { ", " };
                    let _ = write!(out, "{sep}{}", format_param(raw, mode));
                }
                out.push('\n');
                addr += instruction.width() as usize;
            }
            None => {
                let _ = writeln!(out, "{addr:>5}: DATA {}", words[addr]);
                addr += 1;
            }
        }
    }

    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn format_param(raw: i64, mode: Mode) -> String {
    match mode {
        Mode::Position => format!("[{raw}]"),
        Mode::Immediate => raw.to_string(),
        Mode::Relative if raw < 0 => format!("[rb{raw}]"),
        Mode::Relative => format!("[rb+{raw}]"),
    }
}
