use crate::agent::{AgentOutput, StopReason};
use crate::error::AgentError;
use crate::parser::ToolInvocation;
use crate::scratchpad::AgentStep;

/// Where a run currently is.
///
/// `Thinking` and `AwaitingToolResult` alternate until the run reaches one
/// of the terminal stages.
#[derive(Debug)]
pub(crate) enum AgentStage {
    Thinking,
    AwaitingToolResult(ToolInvocation),
    Done(String, StopReason),
    Failed(AgentError),
}

/// State owned by a single run.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub steps: Vec<AgentStep>,
    /// Number of times the run entered `Thinking` and called the model.
    pub iterations: usize,
    /// Unparseable outputs in a row.
    pub parse_failures: usize,
}

impl RunState {
    #[inline]
    pub fn finish(self, answer: String, stop_reason: StopReason) -> AgentOutput {
        AgentOutput {
            answer,
            intermediate_steps: self.steps,
            stop_reason,
            iterations: self.iterations,
        }
    }
}
