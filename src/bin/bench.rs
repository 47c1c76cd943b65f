//! Interpreter benchmark binary.
//!
//! Measures execution time of representative Intcode programs.
//! Run with: `cargo run --release --bin bench`

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use intcode::virtual_machine::io::FnInput;
use intcode::virtual_machine::pipeline::{PipelineConfig, amplify};
use intcode::virtual_machine::program::Program;
use intcode::virtual_machine::vm::{ExitReason, VM};

// ---------------------------------------------------------------------------
// Benchmark harness
// ---------------------------------------------------------------------------

struct BenchResult {
    name: &'static str,
    iterations: u64,
    total: Duration,
    /// Instructions executed per run (0 to omit the ns/instr column).
    steps: u64,
}

impl BenchResult {
    fn avg(&self) -> Duration {
        self.total / self.iterations as u32
    }

    fn print(&self) {
        let avg = self.avg();
        let ns_per_op = avg.as_nanos();
        let ns_per_instr = Some(self.steps)
            .filter(|&n| n > 0)
            .map(|n| format!("{:>8.1}", ns_per_op as f64 / n as f64))
            .unwrap_or_else(|| "       -".to_string());
        println!(
            "  {:<30} {:>7} iters {:>10.3} us/iter {:>12} steps  {} ns/instr",
            self.name,
            self.iterations,
            ns_per_op as f64 / 1000.0,
            self.steps,
            ns_per_instr,
        );
    }
}

/// Runs `f` for at least `min_duration`, returning aggregated results.
///
/// `f` returns the number of instructions it executed.
fn bench<F>(name: &'static str, min_duration: Duration, mut f: F) -> BenchResult
where
    F: FnMut() -> u64,
{
    // Warmup
    for _ in 0..5 {
        f();
    }

    let mut iterations = 0u64;
    let mut last_steps = 0u64;
    let start = Instant::now();
    while start.elapsed() < min_duration {
        last_steps = f();
        iterations += 1;
    }
    let total = start.elapsed();

    BenchResult {
        name,
        iterations,
        total,
        steps: last_steps,
    }
}

/// Runs `program` to halt with no input, returns instructions executed.
fn run_steps(program: &Program) -> u64 {
    let mut vm = VM::with_io(program, VecDeque::new(), ());
    assert_eq!(vm.resume().expect("run"), ExitReason::Terminated);
    vm.steps()
}

// ---------------------------------------------------------------------------
// Benchmark definitions
// ---------------------------------------------------------------------------

/// Decrements a counter at address 100 until it reaches zero.
fn countdown(n: i64) -> String {
    format!("1101,0,{n},100,1001,100,-1,100,1005,100,4,99")
}

/// Relative-mode arithmetic and comparisons in a counted loop.
fn arithmetic_mix(n: i64) -> String {
    format!("1101,0,{n},200,109,300,21101,3,4,0,22202,0,0,1,22107,10,1,2,1001,200,-1,200,1005,200,6,99")
}

/// Echoes inputs until it reads zero.
const ECHO: &str = "3,100,4,100,1005,100,0,99";

const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";

const FEEDBACK: &str =
    "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let min = Duration::from_secs(2);

    println!("Intcode Benchmarks (each runs for >= 2s)\n");
    println!(
        "  {:<30} {:>7}       {:>14} {:>12}  {:>10}",
        "benchmark", "iters", "avg time", "steps/run", "ns/instr"
    );
    println!("  {}", "-".repeat(84));

    // Parse once (parsing cost excluded from benchmark)
    let countdown_prog: Program = countdown(100_000).parse().expect("parse");
    let arith_prog: Program = arithmetic_mix(10_000).parse().expect("parse");
    let echo_prog: Program = ECHO.parse().expect("parse");
    let quine_prog: Program = QUINE.parse().expect("parse");
    let feedback_prog: Program = FEEDBACK.parse().expect("parse");

    // 1. Tight loop (100K iterations)
    let r = bench("countdown(100K)", min, || run_steps(&countdown_prog));
    r.print();

    // 2. Relative-mode arithmetic (10K iterations)
    let r = bench("arithmetic_mix(10K)", min, || run_steps(&arith_prog));
    r.print();

    // 3. Input/output through callbacks (10K values)
    let r = bench("echo(10K)", min, || {
        let mut next = 10_000;
        let input = FnInput(|| {
            let value = next;
            next -= 1;
            (value >= 0).then_some(value)
        });
        let mut vm = VM::with_io(&echo_prog, input, ());
        assert_eq!(vm.resume().expect("run"), ExitReason::Terminated);
        vm.steps()
    });
    r.print();

    // 4. Self-reproducing program, output collected
    let r = bench("quine", min, || {
        let mut vm = VM::new(&quine_prog);
        assert_eq!(vm.resume().expect("run"), ExitReason::Terminated);
        vm.steps()
    });
    r.print();

    // 5. Five-stage feedback pipeline, one thread per stage
    let r = bench("amplifier_feedback(5)", min, || {
        amplify(
            &feedback_prog,
            &[9, 8, 7, 6, 5],
            0,
            true,
            PipelineConfig::default(),
        )
        .expect("pipeline");
        0
    });
    r.print();

    println!();
}
