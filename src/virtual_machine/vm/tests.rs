use super::*;
use crate::utils::test_utils::utils::{render_with_inputs, run_text, run_with_inputs};
use crate::virtual_machine::io::{FnInput, FnOutput};

const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";

const COMPARE_TO_EIGHT: &str = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,999,1105,1,46,1101,1000,1,20,4,\
20,1105,1,46,98,99";

/// Reads two values and outputs their sum.
const ADD_TWO_INPUTS: &str = "3,11,3,12,1,11,12,13,4,13,99,0,0,0";

fn run_expect_fault(text: &str, inputs: &[i64]) -> (VM, Fault) {
    let mut vm = VM::from_text(text).expect("program parse failed");
    vm.feed(inputs.iter().copied());
    let fault = vm.resume().expect_err("expected fault");
    (vm, fault)
}

// ==================== Arithmetic ====================

#[test]
fn add_and_multiply_in_place() {
    assert_eq!(
        run_text("1,9,10,3,2,3,11,0,99,30,40,50"),
        "[3500,9,10,70,2,3,11,0,99,30,40,50]"
    );
    assert_eq!(run_text("1,0,0,0,99"), "[2,0,0,0,99]");
    assert_eq!(run_text("2,3,0,3,99"), "[2,3,0,6,99]");
    assert_eq!(run_text("2,4,4,5,99,0"), "[2,4,4,5,99,9801]");
    assert_eq!(run_text("1,1,1,4,99,5,6,0,99"), "[30,1,1,4,2,5,6,0,99]");
}

#[test]
fn immediate_operands() {
    assert_eq!(run_text("1002,4,3,4,33"), "[1002,4,3,4,99]");
    assert_eq!(run_text("1101,100,-1,4,0"), "[1101,100,-1,4,99]");
}

#[test]
fn large_products() {
    let outputs = run_with_inputs("1102,34915192,34915192,7,4,7,99,0", &[]);
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].to_string().len(), 16);

    assert_eq!(
        run_with_inputs("104,1125899906842624,99", &[]),
        vec![1125899906842624]
    );
}

#[test]
fn arithmetic_wraps_on_overflow() {
    let program = format!("1101,{},1,7,4,7,99", i64::MAX);
    assert_eq!(run_with_inputs(&program, &[]), vec![i64::MIN]);

    let program = format!("1102,{},2,7,4,7,99", i64::MAX);
    assert_eq!(run_with_inputs(&program, &[]), vec![-2]);
}

// ==================== Comparisons and jumps ====================

#[test]
fn equality_position_mode() {
    let program = "3,9,8,9,10,9,4,9,99,-1,8";
    assert_eq!(run_with_inputs(program, &[8]), vec![1]);
    assert_eq!(run_with_inputs(program, &[7]), vec![0]);
    assert_eq!(run_with_inputs(program, &[9]), vec![0]);
}

#[test]
fn less_than_position_mode() {
    let program = "3,9,7,9,10,9,4,9,99,-1,8";
    assert_eq!(run_with_inputs(program, &[7]), vec![1]);
    assert_eq!(run_with_inputs(program, &[8]), vec![0]);
}

#[test]
fn comparisons_immediate_mode() {
    assert_eq!(run_with_inputs("3,3,1108,-1,8,3,4,3,99", &[8]), vec![1]);
    assert_eq!(run_with_inputs("3,3,1108,-1,8,3,4,3,99", &[5]), vec![0]);
    assert_eq!(run_with_inputs("3,3,1107,-1,8,3,4,3,99", &[5]), vec![1]);
    assert_eq!(run_with_inputs("3,3,1107,-1,8,3,4,3,99", &[8]), vec![0]);
}

#[test]
fn jumps() {
    let position = "3,12,6,12,15,1,13,14,13,4,13,99,-1,0,1,9";
    let immediate = "3,3,1105,-1,9,1101,0,0,12,4,12,99,1";
    for program in [position, immediate] {
        assert_eq!(run_with_inputs(program, &[0]), vec![0]);
        assert_eq!(run_with_inputs(program, &[-3]), vec![1]);
    }
}

#[test]
fn compare_to_eight() {
    assert_eq!(run_with_inputs(COMPARE_TO_EIGHT, &[7]), vec![999]);
    assert_eq!(run_with_inputs(COMPARE_TO_EIGHT, &[8]), vec![1000]);
    assert_eq!(run_with_inputs(COMPARE_TO_EIGHT, &[9]), vec![1001]);
}

#[test]
fn memory_image_after_each_opcode() {
    let cases: &[(&str, &[i64], &str)] = &[
        // IN, position and relative destinations
        ("3,3,99,0", &[42], "[3,3,99,42]"),
        ("3,5,99", &[-7], "[3,5,99,0,0,-7]"),
        ("109,5,203,1,99,0,0", &[9], "[109,5,203,1,99,0,9]"),
        // LT
        ("1107,1,2,5,99,7", &[], "[1107,1,2,5,99,1]"),
        ("1107,2,1,5,99,7", &[], "[1107,2,1,5,99,0]"),
        ("7,5,6,7,99,3,9,-1", &[], "[7,5,6,7,99,3,9,1]"),
        // EQ
        ("1108,3,3,5,99,0", &[], "[1108,3,3,5,99,1]"),
        ("1108,3,4,5,99,7", &[], "[1108,3,4,5,99,0]"),
        ("8,5,6,7,99,4,4,-1", &[], "[8,5,6,7,99,4,4,1]"),
        // JT taken skips the first HALT, not taken falls through to the ADD
        ("1105,1,4,99,1101,2,3,9,99", &[], "[1105,1,4,99,1101,2,3,9,99,5]"),
        ("1105,0,7,1101,2,3,9,99", &[], "[1105,0,7,1101,2,3,9,99,0,5]"),
        // JF mirrors JT
        ("1106,0,4,99,1101,2,3,9,99", &[], "[1106,0,4,99,1101,2,3,9,99,5]"),
        ("1106,1,7,1101,2,3,9,99", &[], "[1106,1,7,1101,2,3,9,99,0,5]"),
        // Condition read in position mode
        ("1005,7,8,99,0,0,0,1,1101,4,5,11,99", &[], "[1005,7,8,99,0,0,0,1,1101,4,5,9,99]"),
    ];
    for &(program, inputs, expected) in cases {
        assert_eq!(render_with_inputs(program, inputs), expected, "program {program}");
    }
}

// ==================== Relative mode ====================

#[test]
fn quine_outputs_itself() {
    let program: Program = QUINE.parse().unwrap();
    let (reason, outputs) = VM::run_with(&program, &[]).unwrap();
    assert_eq!(reason, ExitReason::Terminated);
    assert_eq!(outputs, program.words());
}

#[test]
fn relative_destination() {
    let mut vm = VM::from_text("109,10,21101,3,4,0,204,0,99").unwrap();
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    assert_eq!(vm.relative_base(), 10);
    assert_eq!(vm.output(), &vec![7]);
    assert_eq!(vm.render(), "[109,10,21101,3,4,0,204,0,99,0,7]");
}

#[test]
fn relative_input() {
    assert_eq!(run_with_inputs("109,7,203,0,204,0,99", &[42]), vec![42]);
}

#[test]
fn mode_digits_beyond_arity_are_ignored() {
    assert_eq!(run_with_inputs("11104,7,99", &[]), vec![7]);
}

// ==================== Memory ====================

#[test]
fn far_writes_stay_sparse() {
    let mut vm = VM::from_text("1101,1,2,1000000000,99").unwrap();
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    assert_eq!(vm.peek(1_000_000_000), Ok(3));
    assert_eq!(vm.peek(999_999_999), Ok(0));
    assert_eq!(vm.memory().high_water(), Some(1_000_000_000));
}

#[test]
fn reads_past_program_are_zero() {
    assert_eq!(run_with_inputs("4,50,99", &[]), vec![0]);
    assert_eq!(run_text("4,50,99"), "[4,50,99]");
}

#[test]
fn peek_and_poke() {
    let mut vm = VM::from_text("1,9,10,3,2,3,11,0,99,30,40,50").unwrap();
    vm.poke(1, 10).unwrap();
    vm.poke(2, 11).unwrap();
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    assert_eq!(vm.peek(0), Ok(4500));
    assert_eq!(vm.peek(-1), Err(VMError::InvalidAddress { address: -1 }));
    assert_eq!(
        vm.poke(-2, 0),
        Err(VMError::InvalidAddress { address: -2 })
    );
}

#[test]
fn fresh_machine_renders_program_text() {
    let vm = VM::from_text(QUINE).unwrap();
    assert_eq!(vm.render(), format!("[{QUINE}]"));
    assert_eq!(vm.status(), Status::Running);
    assert_eq!((vm.ip(), vm.relative_base(), vm.steps()), (0, 0, 0));
}

#[test]
fn display_matches_render() {
    let mut vm = VM::from_text("1,0,0,0,99").unwrap();
    vm.resume().unwrap();
    assert_eq!(format!("{vm}"), vm.render());
}

// ==================== Suspension ====================

#[test]
fn suspends_until_input_arrives() {
    let mut vm = VM::from_text("3,9,8,9,10,9,4,9,99,-1,8").unwrap();
    assert_eq!(vm.resume(), Ok(ExitReason::NeedsInput));
    assert_eq!(vm.status(), Status::AwaitingInput);
    assert_eq!(vm.ip(), 0);
    assert_eq!(vm.steps(), 0);

    assert_eq!(vm.resume(), Ok(ExitReason::NeedsInput));
    assert_eq!(vm.ip(), 0);

    vm.feed([8]);
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    assert_eq!(vm.status(), Status::Halted);
    assert_eq!(vm.take_output(), vec![1]);
}

#[test]
fn incremental_input_matches_batch() {
    let mut batch = VM::from_text(ADD_TWO_INPUTS).unwrap();
    batch.feed([5, 6]);
    assert_eq!(batch.resume(), Ok(ExitReason::Terminated));

    let mut incremental = VM::from_text(ADD_TWO_INPUTS).unwrap();
    assert_eq!(incremental.resume(), Ok(ExitReason::NeedsInput));
    incremental.feed([5]);
    assert_eq!(incremental.resume(), Ok(ExitReason::NeedsInput));
    assert_eq!(incremental.ip(), 2);
    incremental.feed([6]);
    assert_eq!(incremental.resume(), Ok(ExitReason::Terminated));

    assert_eq!(batch.output(), &vec![11]);
    assert_eq!(incremental.output(), batch.output());
    assert_eq!(incremental.render(), batch.render());
    assert_eq!(incremental.steps(), batch.steps());
}

#[test]
fn outputs_arrive_before_suspension() {
    let mut vm = VM::from_text("104,1,104,2,3,0,99").unwrap();
    assert_eq!(vm.resume(), Ok(ExitReason::NeedsInput));
    assert_eq!(vm.output(), &vec![1, 2]);
}

#[test]
fn halted_resume_is_a_no_op() {
    let mut vm = VM::from_text("1,0,0,0,99").unwrap();
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    let steps = vm.steps();
    let memory = vm.render();

    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    assert_eq!(vm.steps(), steps);
    assert_eq!(vm.render(), memory);
    assert_eq!(vm.ip(), 4);
}

#[test]
fn single_steps() {
    let mut vm = VM::from_text("1,0,0,0,99").unwrap();
    assert_eq!(vm.step(), Ok(None));
    assert_eq!(vm.ip(), 4);
    assert_eq!(vm.steps(), 1);
    assert_eq!(vm.step(), Ok(Some(ExitReason::Terminated)));
    assert_eq!(vm.step(), Ok(Some(ExitReason::Terminated)));
    assert_eq!(vm.steps(), 2);
}

// ==================== Custom channels ====================

#[test]
fn callback_channels() {
    let mut pending = vec![3, 4];
    let mut seen = Vec::new();
    let program: Program = ADD_TWO_INPUTS.parse().unwrap();
    let mut vm = VM::with_io(
        &program,
        FnInput(|| pending.pop()),
        FnOutput(|v| seen.push(v)),
    );
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    drop(vm);
    assert_eq!(seen, vec![7]);
}

#[test]
fn into_io_returns_channels() {
    let program: Program = "3,0,4,0,99".parse().unwrap();
    let mut vm = VM::with_io(&program, VecDeque::from([12, 13]), Vec::new());
    assert_eq!(vm.resume(), Ok(ExitReason::Terminated));
    let (input, output) = vm.into_io();
    assert_eq!(input, VecDeque::from([13]));
    assert_eq!(output, vec![12]);
}

// ==================== Faults ====================

#[test]
fn invalid_opcode() {
    let (vm, fault) = run_expect_fault("1,0,0,0,42", &[]);
    assert_eq!(
        fault,
        Fault {
            ip: 4,
            error: VMError::InvalidOpcode { opcode: 42 }
        }
    );
    assert_eq!(vm.status(), Status::Faulted);
    assert_eq!(vm.steps(), 1);
    assert_eq!(vm.render(), "[2,0,0,0,42]");
}

#[test]
fn invalid_mode() {
    let (_, fault) = run_expect_fault("301,0,0,0,99", &[]);
    assert_eq!(
        fault.error,
        VMError::InvalidMode {
            mode: 3,
            parameter: 1
        }
    );
    assert_eq!(fault.ip, 0);
}

#[test]
fn immediate_destination_is_rejected() {
    let (vm, fault) = run_expect_fault("11101,1,1,0,99", &[]);
    assert_eq!(fault.error, VMError::InvalidWriteMode { parameter: 3 });
    assert_eq!(vm.peek(0), Ok(11101));
}

#[test]
fn negative_read_address() {
    let (_, fault) = run_expect_fault("4,-1,99", &[]);
    assert_eq!(
        fault,
        Fault {
            ip: 0,
            error: VMError::InvalidAddress { address: -1 }
        }
    );
}

#[test]
fn negative_relative_address() {
    let (_, fault) = run_expect_fault("109,-5,204,0,99", &[]);
    assert_eq!(fault.ip, 2);
    assert_eq!(fault.error, VMError::InvalidAddress { address: -5 });
}

#[test]
fn negative_jump_target() {
    let (vm, fault) = run_expect_fault("1105,1,-4,99", &[]);
    assert_eq!(fault.error, VMError::InvalidAddress { address: -4 });
    assert_eq!(vm.ip(), 0);
}

#[test]
fn failed_input_keeps_value() {
    let (vm, fault) = run_expect_fault("3,-1,99", &[5]);
    assert_eq!(fault.error, VMError::InvalidAddress { address: -1 });
    assert_eq!(vm.input(), &VecDeque::from([5]));
}

#[test]
fn faulted_machine_stays_faulted() {
    let (mut vm, fault) = run_expect_fault("1,0,0,0,42", &[]);
    let again = vm.resume().unwrap_err();
    assert_eq!(again.ip, fault.ip);
    assert_eq!(again.error, VMError::Faulted);
    assert_eq!(vm.step().unwrap_err().error, VMError::Faulted);
    assert_eq!(vm.status(), Status::Faulted);
}

#[test]
fn running_off_the_end_faults() {
    // Memory past the program reads as 0, which is not an opcode.
    let (_, fault) = run_expect_fault("1101,1,1,5", &[]);
    assert_eq!(
        fault,
        Fault {
            ip: 4,
            error: VMError::InvalidOpcode { opcode: 0 }
        }
    );
}

#[test]
fn from_text_reports_parse_errors() {
    assert_eq!(VM::from_text("").unwrap_err(), VMError::EmptyProgram);
    assert!(matches!(
        VM::from_text("1,a,3").unwrap_err(),
        VMError::InvalidProgramText { index: 1, .. }
    ));
}
