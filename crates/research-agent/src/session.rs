use research_agent_core::conversation::{Role, Transcript};
use research_agent_core::tool::Tool;
use research_agent_core::{
    Agent, AgentBuilder, AgentError, AgentStep, EarlyStopping,
};
use research_agent_model::ModelProvider;
use research_agent_openai_model::OpenAIProvider;

use crate::config::{CredentialStatus, ResearchConfig};

/// The first assistant turn of every session.
pub const GREETING: &str = "Hello! I'm your expert research assistant. What topic should I research for you today?";

const EMPTY_ANSWER: &str = "Agent did not return a structured output.";

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    health: CredentialStatus,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider and no
    /// tools.
    ///
    /// The session reports itself as healthy, since the caller owns the
    /// provider's credentials.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            health: CredentialStatus::READY,
        }
    }

    /// Creates a session builder wired to the configured model and the web
    /// search tool.
    pub fn from_config(config: &ResearchConfig) -> Self {
        let provider = OpenAIProvider::new(config.model_config());
        Self::with_model_provider(provider)
            .with_tool(config.search_tool())
            .with_temperature(config.temperature())
            .with_max_iterations(config.max_iterations())
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.agent_builder = self.agent_builder.with_tool(tool);
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.agent_builder = self.agent_builder.with_temperature(temperature);
        self
    }

    /// Sets the iteration limit of the agent.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.agent_builder =
            self.agent_builder.with_max_iterations(max_iterations);
        self
    }

    /// Sets what happens when the iteration limit is reached.
    #[inline]
    pub fn with_early_stopping(mut self, early_stopping: EarlyStopping) -> Self {
        self.agent_builder =
            self.agent_builder.with_early_stopping(early_stopping);
        self
    }

    /// Overrides the reported credential status.
    #[inline]
    pub fn with_health(mut self, health: CredentialStatus) -> Self {
        self.health = health;
        self
    }

    /// Attaches a callback to be invoked for every agent step.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&AgentStep) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_step(on_step);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            agent: self.agent_builder.build(),
            transcript: Transcript::with_greeting(GREETING),
            health: self.health,
        }
    }
}

/// A chat session, like a window that displays messages and has an input
/// box.
///
/// The session owns the transcript and a fully configured agent. Every
/// submitted query runs the agent once and adds one user and one assistant
/// turn.
pub struct Session {
    agent: Agent,
    transcript: Transcript,
    health: CredentialStatus,
}

impl Session {
    /// Answers a query and records the exchange.
    ///
    /// This never fails: agent errors are turned into an error message that
    /// is recorded and returned like any other answer.
    pub async fn submit(&mut self, query: &str) -> String {
        self.transcript.push(Role::User, query);

        let answer = match self.agent.run(query).await {
            Ok(output) => {
                debug!(
                    "answered after {} iterations with {} steps",
                    output.iterations,
                    output.intermediate_steps.len()
                );
                output.answer
            }
            Err(err) => {
                error!("agent failed: {err}");
                error_message(&err)
            }
        };
        let answer = if answer.trim().is_empty() {
            EMPTY_ANSWER.to_owned()
        } else {
            answer
        };

        self.transcript.push(Role::Assistant, answer.as_str());
        answer
    }

    /// Returns the transcript, greeting first.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the credential status reported by the health indicator.
    #[inline]
    pub fn health(&self) -> CredentialStatus {
        self.health
    }
}

#[inline]
fn error_message(err: &AgentError) -> String {
    format!("An error occurred during agent execution: {err}")
}
