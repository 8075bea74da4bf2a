mod builder;
mod state;
#[cfg(test)]
mod tests;

use research_agent_model::{ErrorKind, ModelFinishReason, ModelRequest};
use tracing::Instrument;

use crate::error::AgentError;
use crate::model_client::ModelClient;
use crate::parser::{self, ParsedOutput, ToolInvocation};
use crate::prompt::PromptTemplate;
use crate::scratchpad::{AgentStep, EXCEPTION_TOOL, format_scratchpad};
use crate::tool::{Executor as ToolExecutor, ToolDescription};
pub use builder::AgentBuilder;
use state::{AgentStage, RunState};

/// Default number of model calls allowed per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 30;
/// Default number of unparseable outputs in a row that are retried.
pub const DEFAULT_MAX_PARSE_RETRIES: usize = 1;

const STOP_SEQUENCE: &str = "\nObservation";
const EARLY_STOP_SUFFIX: &str =
    "\n\nI now need to return a final answer based on the previous steps:";
const FORCED_STOP_ANSWER: &str = "Agent stopped due to iteration limit.";

/// What the agent does once the iteration limit is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EarlyStopping {
    /// Ask the model one last time for a final answer based on the steps so
    /// far.
    #[default]
    Generate,
    /// Return a fixed message without calling the model.
    Force,
}

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The model produced a final answer.
    FinalAnswer,
    /// The iteration limit was reached.
    IterationLimit,
}

/// The result of a successful run.
#[derive(Clone, Debug)]
pub struct AgentOutput {
    /// The final answer in Markdown.
    pub answer: String,
    /// Every recorded step, in order.
    pub intermediate_steps: Vec<AgentStep>,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// Number of model calls made in the reasoning loop.
    pub iterations: usize,
}

impl AgentOutput {
    /// Returns `true` if any step called the named tool.
    #[inline]
    pub fn used_tool(&self, name: &str) -> bool {
        self.intermediate_steps.iter().any(|step| step.tool == name)
    }
}

/// A ReAct agent that alternates between asking the model what to do and
/// running the tool it picked, until the model gives a final answer.
///
/// An agent holds no state between runs, so one instance can serve any
/// number of questions, including concurrently.
pub struct Agent {
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    tool_descriptions: Vec<ToolDescription>,
    prompt: PromptTemplate,
    temperature: Option<f32>,
    max_iterations: usize,
    max_parse_retries: usize,
    early_stopping: EarlyStopping,
    on_step: Option<Box<dyn Fn(&AgentStep) + Send + Sync>>,
}

impl Agent {
    /// Returns the names of the registered tools.
    #[inline]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_executor.names()
    }

    /// Returns the iteration limit.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Answers a single question.
    pub async fn run(&self, question: &str) -> Result<AgentOutput, AgentError> {
        self.run_loop(question)
            .instrument(info_span!("agent run"))
            .await
    }

    async fn run_loop(&self, question: &str) -> Result<AgentOutput, AgentError> {
        debug!("start answering: {question:?}");
        let mut run = RunState::default();
        let mut stage = AgentStage::Thinking;
        loop {
            stage = match stage {
                AgentStage::Thinking => self.think(question, &mut run).await,
                AgentStage::AwaitingToolResult(invocation) => {
                    self.act(invocation, &mut run).await
                }
                AgentStage::Done(answer, stop_reason) => {
                    info!(
                        "run finished after {} iterations ({stop_reason:?})",
                        run.iterations
                    );
                    return Ok(run.finish(answer, stop_reason));
                }
                AgentStage::Failed(err) => {
                    warn!("run failed after {} iterations: {err}", run.iterations);
                    return Err(err);
                }
            };
        }
    }

    async fn think(&self, question: &str, run: &mut RunState) -> AgentStage {
        if run.iterations >= self.max_iterations {
            info!(
                "iteration limit reached ({}), stopping early",
                self.max_iterations
            );
            return self.stop_early(question, run).await;
        }
        run.iterations += 1;

        let scratchpad = format_scratchpad(&run.steps);
        let output = match self.complete(question, &scratchpad).await {
            Ok(output) => output,
            Err(err) => return AgentStage::Failed(err),
        };

        match parser::parse(&output) {
            Ok(ParsedOutput::Finish(finish)) => {
                debug!("got the final answer");
                AgentStage::Done(finish.answer, StopReason::FinalAnswer)
            }
            Ok(ParsedOutput::Action(invocation)) => {
                run.parse_failures = 0;
                AgentStage::AwaitingToolResult(invocation)
            }
            Err(err) => {
                run.parse_failures += 1;
                if run.parse_failures > self.max_parse_retries {
                    return AgentStage::Failed(AgentError::OutputParse {
                        notice: err.notice().to_owned(),
                        output: output.clone(),
                        attempts: run.parse_failures,
                    });
                }
                warn!("unparseable model output, asking again: {}", err.notice());
                self.record(
                    run,
                    AgentStep {
                        thought: String::new(),
                        tool: EXCEPTION_TOOL.to_owned(),
                        tool_input: output.clone(),
                        observation: err.notice().to_owned(),
                        log: output,
                    },
                );
                AgentStage::Thinking
            }
        }
    }

    async fn act(
        &self,
        invocation: ToolInvocation,
        run: &mut RunState,
    ) -> AgentStage {
        let ToolInvocation {
            thought,
            tool,
            tool_input,
            log,
        } = invocation;
        let observation =
            match self.tool_executor.execute(&tool, &tool_input).await {
                Some(Ok(output)) => output,
                Some(Err(err)) => format!("Error: {err}"),
                None => format!(
                    "{tool} is not a valid tool, try one of [{}].",
                    self.tool_executor.names().join(", ")
                ),
            };
        self.record(
            run,
            AgentStep {
                thought,
                tool,
                tool_input,
                observation,
                log,
            },
        );
        AgentStage::Thinking
    }

    async fn stop_early(&self, question: &str, run: &RunState) -> AgentStage {
        match self.early_stopping {
            EarlyStopping::Force => AgentStage::Done(
                FORCED_STOP_ANSWER.to_owned(),
                StopReason::IterationLimit,
            ),
            EarlyStopping::Generate => {
                let mut scratchpad = format_scratchpad(&run.steps);
                scratchpad.push_str(EARLY_STOP_SUFFIX);
                let output = match self.complete(question, &scratchpad).await {
                    Ok(output) => output,
                    Err(err) => return AgentStage::Failed(err),
                };
                let answer = match parser::parse(&output) {
                    Ok(ParsedOutput::Finish(finish)) => finish.answer,
                    _ => output.trim().to_owned(),
                };
                AgentStage::Done(answer, StopReason::IterationLimit)
            }
        }
    }

    async fn complete(
        &self,
        question: &str,
        scratchpad: &str,
    ) -> Result<String, AgentError> {
        let req = ModelRequest {
            messages: self.prompt.render(
                &self.tool_descriptions,
                scratchpad,
                question,
            ),
            temperature: self.temperature,
            stop: vec![STOP_SEQUENCE.to_owned()],
        };
        let resp = self.model_client.send_request(req).await.map_err(|err| {
            AgentError::Model {
                kind: err.kind(),
                message: err.to_string(),
            }
        })?;

        match resp.finish_reason {
            Some(ModelFinishReason::ContentFilter) if resp.text.is_empty() => {
                return Err(AgentError::Model {
                    kind: ErrorKind::Moderated,
                    message: "the response was withheld by the content filter"
                        .to_owned(),
                });
            }
            Some(ModelFinishReason::Length) => {
                warn!("model output was cut off by the token limit");
            }
            _ => {}
        }
        trace!("model output: {:?}", resp.text);
        Ok(resp.text)
    }

    fn record(&self, run: &mut RunState, step: AgentStep) {
        debug!("step {}: {} <- {:?}", run.steps.len() + 1, step.tool, step.tool_input);
        if let Some(on_step) = &self.on_step {
            on_step(&step);
        }
        run.steps.push(step);
    }
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            tool_executor,
            prompt,
            temperature,
            max_iterations,
            max_parse_retries,
            early_stopping,
            on_step,
        } = builder;

        let tool_descriptions = tool_executor.descriptions();
        Self {
            model_client,
            tool_executor,
            tool_descriptions,
            prompt,
            temperature,
            max_iterations,
            max_parse_retries,
            early_stopping,
            on_step,
        }
    }
}
