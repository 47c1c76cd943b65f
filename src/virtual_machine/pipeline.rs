//! Machines chained output to input, each driven on its own thread.
//!
//! A [`Pipeline`] is an ordered list of stages. Stage `i` writes into a
//! bounded channel read by stage `i + 1`; in feedback mode the last stage also
//! writes back into the first. Each stage starts with its own initial inputs
//! (a phase setting, a seed) and reads from its upstream channel once those
//! run out.
//!
//! Stages need no scheduler: a stage blocks in its input instruction until
//! upstream produces, and in its output instruction while the downstream
//! buffer is full. When a stage stops, for any reason, its channel ends are
//! dropped. Downstream then sees end of input, and upstream sends are
//! discarded, so no sibling is left blocked forever.

use crate::virtual_machine::errors::Fault;
use crate::virtual_machine::io::{Chain, ChannelInput, ChannelOutput, channel};
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::{ExitReason, VM};
use crate::{debug, error};
use intcode_derive::Error;
use std::collections::VecDeque;
use std::thread;

/// Default number of values a channel between two stages can buffer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Pipeline tuning.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PipelineConfig {
    /// Values buffered between two stages before the producer blocks.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.channel_capacity == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: "channel capacity must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Errors raised while running a pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("invalid pipeline config: {reason}")]
    InvalidConfig { reason: String },
    #[error("stage {stage} faulted: {fault}")]
    StageFault { stage: usize, fault: Fault },
    /// The stage needed input but its initial values were used up and its
    /// upstream had stopped.
    #[error("stage {stage} ran out of input")]
    InputClosed { stage: usize },
    #[error("stage {stage} panicked")]
    StagePanicked { stage: usize },
    #[error("failed to spawn thread for stage {stage}: {reason}")]
    Spawn { stage: usize, reason: String },
    #[error("pipeline produced no output")]
    NoOutput,
}

/// Stage input: initial values first, then the upstream channel if any.
type StageInput = Chain<VecDeque<i64>, Option<ChannelInput>>;
/// Stage output: the downstream channel if any, plus a record of every value
/// for the last stage.
type StageOutput = (Option<ChannelOutput>, Option<Vec<i64>>);
type StageVm = VM<StageInput, StageOutput>;
type StageResult = Result<Vec<i64>, PipelineError>;

struct Stage {
    program: Program,
    inputs: Vec<i64>,
}

/// Builder and runner for a chain of machines.
///
/// ```
/// use intcode::virtual_machine::pipeline::{Pipeline, PipelineConfig};
/// use intcode::virtual_machine::program::Program;
///
/// // Reads one value and outputs it doubled.
/// let double: Program = "3,9,1002,9,2,9,4,9,99".parse().unwrap();
///
/// let outputs = Pipeline::new(PipelineConfig::default())
///     .stage(double.clone(), [5])
///     .stage(double, [])
///     .run()
///     .unwrap();
/// assert_eq!(outputs, vec![20]);
/// ```
pub struct Pipeline {
    stages: Vec<Stage>,
    feedback: bool,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            stages: Vec::new(),
            feedback: false,
            config,
        }
    }

    /// Appends a stage running `program`, primed with `inputs`.
    pub fn stage<T: IntoIterator<Item = i64>>(mut self, program: Program, inputs: T) -> Self {
        self.stages.push(Stage {
            program,
            inputs: inputs.into_iter().collect(),
        });
        self
    }

    /// Routes the last stage's output back into the first stage.
    pub fn feedback(mut self, enabled: bool) -> Self {
        self.feedback = enabled;
        self
    }

    /// Number of stages added so far.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage to completion and returns all values emitted by the
    /// last stage, in order.
    ///
    /// A stage fault or panic is reported in preference to the
    /// [`PipelineError::InputClosed`] errors it causes in its neighbors.
    pub fn run(self) -> Result<Vec<i64>, PipelineError> {
        self.config.validate()?;
        if self.stages.is_empty() {
            return Err(PipelineError::InvalidConfig {
                reason: "pipeline has no stages".into(),
            });
        }

        let last = self.stages.len() - 1;
        let machines = self.wire();

        let results = thread::scope(|scope| -> Result<Vec<StageResult>, PipelineError> {
            let mut handles = Vec::with_capacity(machines.len());
            for (stage, vm) in machines.into_iter().enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("intcode-stage-{stage}"))
                    .spawn_scoped(scope, move || run_stage(stage, vm))
                    .map_err(|e| PipelineError::Spawn {
                        stage,
                        reason: e.to_string(),
                    })?;
                handles.push(handle);
            }

            Ok(handles
                .into_iter()
                .enumerate()
                .map(|(stage, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(PipelineError::StagePanicked { stage }))
                })
                .collect())
        })?;

        let mut closed = None;
        let mut outputs = Vec::new();
        for (stage, result) in results.into_iter().enumerate() {
            match result {
                Ok(values) if stage == last => outputs = values,
                Ok(_) => {}
                Err(e @ PipelineError::InputClosed { .. }) => {
                    closed.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        match closed {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }

    /// Creates one machine per stage with its channels connected.
    fn wire(self) -> Vec<StageVm> {
        let count = self.stages.len();
        let capacity = self.config.channel_capacity;
        let mut upstream: Vec<Option<ChannelInput>> = (0..count).map(|_| None).collect();
        let mut downstream: Vec<Option<ChannelOutput>> = (0..count).map(|_| None).collect();

        for i in 0..count - 1 {
            let (tx, rx) = channel(capacity);
            downstream[i] = Some(tx);
            upstream[i + 1] = Some(rx);
        }
        if self.feedback {
            let (tx, rx) = channel(capacity);
            downstream[count - 1] = Some(tx);
            upstream[0] = Some(rx);
        }

        self.stages
            .into_iter()
            .zip(upstream.into_iter().zip(downstream))
            .enumerate()
            .map(|(i, (stage, (rx, tx)))| {
                let input = Chain::new(VecDeque::from(stage.inputs), rx);
                let record = (i == count - 1).then(Vec::new);
                VM::with_io(&stage.program, input, (tx, record))
            })
            .collect()
    }
}

/// Drives one stage to completion. Dropping `vm` on return closes its channels.
fn run_stage(stage: usize, mut vm: StageVm) -> StageResult {
    debug!("stage {stage} started");
    match vm.resume() {
        Ok(ExitReason::Terminated) => {
            debug!("stage {stage} halted after {} steps", vm.steps());
            let (_, (tx, record)) = vm.into_io();
            if let Some(tx) = tx
                && tx.dropped() > 0
            {
                debug!(
                    "stage {stage}: {} values sent after downstream stopped",
                    tx.dropped()
                );
            }
            Ok(record.unwrap_or_default())
        }
        Ok(ExitReason::NeedsInput) => {
            error!("stage {stage} ran out of input at ip {}", vm.ip());
            Err(PipelineError::InputClosed { stage })
        }
        Err(fault) => {
            error!("stage {stage} {fault}");
            Err(PipelineError::StageFault { stage, fault })
        }
    }
}

/// Runs an amplifier chain: one copy of `program` per phase setting.
///
/// Stage `i` is primed with `phases[i]`; the first stage additionally gets
/// `seed`. Returns the last value emitted by the last stage. With `feedback`
/// the chain loops until every stage halts.
pub fn amplify(
    program: &Program,
    phases: &[i64],
    seed: i64,
    feedback: bool,
    config: PipelineConfig,
) -> Result<i64, PipelineError> {
    let mut pipeline = Pipeline::new(config).feedback(feedback);
    for (i, &phase) in phases.iter().enumerate() {
        let inputs = if i == 0 { vec![phase, seed] } else { vec![phase] };
        pipeline = pipeline.stage(program.clone(), inputs);
    }
    pipeline
        .run()?
        .last()
        .copied()
        .ok_or(PipelineError::NoOutput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::errors::VMError;

    const LINEAR: &str = "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0";
    const LINEAR_2: &str = "3,23,3,24,1002,24,10,24,1002,23,-1,23,101,5,23,23,1,24,23,23,4,23,99,0,0";
    const FEEDBACK: &str =
        "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";
    const FEEDBACK_2: &str = "3,52,1001,52,-5,52,3,53,1,52,56,54,1007,54,5,55,1005,55,26,1001,54,\
-5,54,1105,1,12,1,53,54,53,1008,54,0,55,1001,55,1,55,2,53,55,53,4,53,1001,56,-1,56,1005,56,6,\
99,0,0,0,0,10";

    fn program(text: &str) -> Program {
        text.parse().unwrap()
    }

    #[test]
    fn linear_chain() {
        let config = PipelineConfig::default();
        assert_eq!(
            amplify(&program(LINEAR), &[4, 3, 2, 1, 0], 0, false, config),
            Ok(43210)
        );
        assert_eq!(
            amplify(&program(LINEAR_2), &[0, 1, 2, 3, 4], 0, false, config),
            Ok(54321)
        );
    }

    #[test]
    fn feedback_loop() {
        let config = PipelineConfig::default();
        assert_eq!(
            amplify(&program(FEEDBACK), &[9, 8, 7, 6, 5], 0, true, config),
            Ok(139629729)
        );
        assert_eq!(
            amplify(&program(FEEDBACK_2), &[9, 7, 8, 5, 6], 0, true, config),
            Ok(18216)
        );
    }

    #[test]
    fn capacity_does_not_change_results() {
        let config = PipelineConfig {
            channel_capacity: 8,
        };
        assert_eq!(
            amplify(&program(FEEDBACK), &[9, 8, 7, 6, 5], 0, true, config),
            Ok(139629729)
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = PipelineConfig {
            channel_capacity: 0,
        };
        assert!(matches!(
            amplify(&program(LINEAR), &[0], 0, false, config),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        assert!(matches!(
            Pipeline::new(PipelineConfig::default()).run(),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn returns_every_value_of_last_stage() {
        let outputs = Pipeline::new(PipelineConfig::default())
            .stage(program("104,1,104,2,104,3,99"), [])
            .stage(program("3,20,3,21,3,22,4,22,4,21,4,20,99"), [])
            .run();
        assert_eq!(outputs, Ok(vec![3, 2, 1]));
    }

    #[test]
    fn fault_is_reported_over_closed_inputs() {
        let echo = program("3,0,4,0,99");
        let result = Pipeline::new(PipelineConfig::default())
            .stage(echo.clone(), [5])
            .stage(program("3,0,42"), [])
            .stage(echo, [])
            .run();
        assert_eq!(
            result,
            Err(PipelineError::StageFault {
                stage: 1,
                fault: Fault {
                    ip: 2,
                    error: VMError::InvalidOpcode { opcode: 42 }
                }
            })
        );
    }

    #[test]
    fn exhausted_input_is_reported() {
        let result = Pipeline::new(PipelineConfig::default())
            .stage(program("3,0,3,1,99"), [1])
            .run();
        assert_eq!(result, Err(PipelineError::InputClosed { stage: 0 }));
    }

    #[test]
    fn silent_chain_has_no_output() {
        assert_eq!(
            amplify(&program("3,0,99"), &[1, 2], 0, false, PipelineConfig::default()),
            Err(PipelineError::NoOutput)
        );
    }

    #[test]
    fn downstream_may_stop_early() {
        // The consumer halts after one value; the producer's later sends are discarded.
        let outputs = Pipeline::new(PipelineConfig::default())
            .stage(program("104,1,104,2,104,3,99"), [])
            .stage(program("3,0,4,0,99"), [])
            .run();
        assert_eq!(outputs, Ok(vec![1]));
    }
}
