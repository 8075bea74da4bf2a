use research_agent_model::ModelProvider;

use super::{
    Agent, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PARSE_RETRIES, EarlyStopping,
};
use crate::model_client::ModelClient;
use crate::prompt::PromptTemplate;
use crate::scratchpad::AgentStep;
use crate::tool::{Executor as ToolExecutor, Tool};

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) tool_executor: ToolExecutor,
    pub(crate) prompt: PromptTemplate,
    pub(crate) temperature: Option<f32>,
    pub(crate) max_iterations: usize,
    pub(crate) max_parse_retries: usize,
    pub(crate) early_stopping: EarlyStopping,
    pub(crate) on_step: Option<Box<dyn Fn(&AgentStep) + Send + Sync>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tool_executor: ToolExecutor::default(),
            prompt: PromptTemplate::default(),
            temperature: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_parse_retries: DEFAULT_MAX_PARSE_RETRIES,
            early_stopping: EarlyStopping::default(),
            on_step: None,
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tool_executor.add_tool(tool);
        self
    }

    /// Replaces the default research prompt.
    #[inline]
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Sets the sampling temperature sent with every model call.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets how many times the agent may call the model before the
    /// early-stopping policy kicks in.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets how many unparseable outputs in a row are answered with a
    /// parse-error notice before the run fails.
    #[inline]
    pub fn with_max_parse_retries(mut self, max_parse_retries: usize) -> Self {
        self.max_parse_retries = max_parse_retries;
        self
    }

    /// Sets what happens when the iteration limit is reached.
    #[inline]
    pub fn with_early_stopping(mut self, early_stopping: EarlyStopping) -> Self {
        self.early_stopping = early_stopping;
        self
    }

    /// Attaches a callback to be invoked whenever a step is recorded.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&AgentStep) + Send + Sync + 'static,
    ) -> Self {
        self.on_step = Some(Box::new(on_step));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
