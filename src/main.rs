//! Intcode program runner.
//!
//! Loads a program text file and runs it to completion.
//!
//! # Usage
//! ```text
//! intcode <program.txt> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program.txt`: Comma-separated Intcode program
//!
//! # Options
//! - `-i, --input <v1,v2,...>`: Queue input values (may be repeated)
//! - `--interactive`: Read further input from stdin once the queue runs dry
//! - `--ascii`: Print output as text and encode stdin lines as character codes
//! - `--disasm`: Print a disassembly instead of running the program
//! - `--dump`: Print memory after the program halts
//!
//! # Environment
//! - `INTCODE_LOG`: `debug`, `info`, `warn`, `error` or `off` (default `info`)
//! - `INTCODE_LOG_TIMESTAMP`: `0` hides log timestamps

use intcode::utils::log;
use intcode::virtual_machine::errors::{Fault, VMError};
use intcode::virtual_machine::io::{Chain, FnOutput, LineInput, ascii_char};
use intcode::virtual_machine::program::{Program, disassemble};
use intcode::virtual_machine::vm::{ExitReason, VM};
use intcode::{debug, error, info};
use intcode_derive::Error;
use std::collections::VecDeque;
use std::env;
use std::io::{self, Write};
use std::process;
use std::time::Instant;

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let program_path = &args[1];
    let mut inputs: Vec<i64> = Vec::new();
    let mut interactive = false;
    let mut ascii = false;
    let mut disasm = false;
    let mut dump = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--input" | "-i") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                inputs.extend(parse_inputs(&args[i]).unwrap_or_else(|token| {
                    error!("Invalid input value: '{token}' is not an integer");
                    process::exit(1);
                }));
                i += 1;
            }
            "--interactive" => {
                interactive = true;
                i += 1;
            }
            "--ascii" => {
                ascii = true;
                i += 1;
            }
            "--disasm" => {
                disasm = true;
                i += 1;
            }
            "--dump" => {
                dump = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let options = RunOptions {
        inputs,
        interactive,
        ascii,
        disasm,
        dump,
    };
    if let Err(e) = run(program_path, options) {
        error!("{e}");
        process::exit(1);
    }
}

/// Flags gathered from the command line.
struct RunOptions {
    inputs: Vec<i64>,
    interactive: bool,
    ascii: bool,
    disasm: bool,
    dump: bool,
}

/// Reasons the runner exits with status 1.
#[derive(Debug, Error)]
enum RunError {
    #[error("{0}")]
    Load(#[from] VMError),

    #[error("{0}")]
    Fault(#[from] Fault),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("Program needs more input at ip {ip} (pass -i or --interactive)")]
    NeedsInput { ip: u64 },

    #[error("Input closed while the program was waiting at ip {ip}")]
    InputClosed { ip: u64 },
}

fn run(program_path: &str, options: RunOptions) -> Result<(), RunError> {
    let program = Program::load(program_path)?;
    debug!("Loaded {} ({} words)", program_path, program.len());

    if options.disasm {
        writeln!(io::stdout().lock(), "{}", disassemble(&program))?;
        return Ok(());
    }

    let ascii = options.ascii;
    let stdin = options.interactive.then(|| LineInput::stdin(ascii));
    let input = Chain::new(VecDeque::from(options.inputs), stdin);
    let output = FnOutput(|value| print_value(value, ascii));
    let mut vm = VM::with_io(&program, input, output);

    let start = Instant::now();
    match vm.resume()? {
        ExitReason::Terminated => {
            info!(
                "Halted after {} instructions in {:.3?}",
                vm.steps(),
                start.elapsed()
            );
        }
        ExitReason::NeedsInput if options.interactive => {
            return Err(RunError::InputClosed { ip: vm.ip() });
        }
        ExitReason::NeedsInput => return Err(RunError::NeedsInput { ip: vm.ip() }),
    }

    if options.dump {
        writeln!(io::stdout().lock(), "{}", vm.render())?;
    }
    Ok(())
}

/// Parses `v1,v2,...`, returning the first bad token on failure.
fn parse_inputs(list: &str) -> Result<Vec<i64>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<i64>().map_err(|_| token.to_string()))
        .collect()
}

/// Prints one output value. A closed or failing stdout ends the process.
fn print_value(value: i64, ascii: bool) {
    if let Err(e) = write_value(&mut io::stdout().lock(), value, ascii) {
        error!("{}", RunError::from(e));
        process::exit(1);
    }
}

/// Writes `value` as a character in ASCII mode when it is one, else as a
/// number on its own line.
fn write_value<W: Write>(out: &mut W, value: i64, ascii: bool) -> io::Result<()> {
    match ascii_char(value).filter(|_| ascii) {
        Some(c) => write!(out, "{c}"),
        None => writeln!(out, "{value}"),
    }
}

const USAGE: &str = "\
Intcode Runner

USAGE:
    {program} <program.txt> [OPTIONS]

ARGS:
    <program.txt>    Comma-separated Intcode program

OPTIONS:
    -i, --input <v1,v2,...>   Queue input values (may be repeated)
        --interactive         Read more input from stdin when the queue runs dry
        --ascii               Print output as text, send stdin lines as character codes
        --disasm              Print a disassembly instead of running
        --dump                Print memory after the program halts
    -h, --help                Print this help message

ENVIRONMENT:
    INTCODE_LOG              debug, info, warn, error or off (default info)
    INTCODE_LOG_TIMESTAMP    0 hides log timestamps

EXAMPLES:
    # Run with one queued input
    {program} day05.txt -i 5

    # Play an ASCII program interactively
    {program} day25.txt --interactive --ascii
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
