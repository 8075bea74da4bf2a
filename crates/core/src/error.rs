use research_agent_model::ErrorKind;
use thiserror::Error;

/// Errors that end a single agent run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model service failed to answer.
    #[error("model request failed ({kind}): {message}")]
    Model {
        /// Classification reported by the provider.
        kind: ErrorKind,
        /// Human-readable description from the provider.
        message: String,
    },
    /// The model kept producing output outside the ReAct grammar.
    #[error("could not parse model output after {attempts} attempts: {notice}")]
    OutputParse {
        /// The parse-error notice of the last attempt.
        notice: String,
        /// The raw output of the last attempt.
        output: String,
        /// Number of consecutive unparseable outputs.
        attempts: usize,
    },
}

impl AgentError {
    /// Returns `true` if the error comes from the model service.
    #[inline]
    pub fn is_upstream(&self) -> bool {
        matches!(self, AgentError::Model { .. })
    }
}
