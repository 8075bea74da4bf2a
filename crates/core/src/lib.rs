//! Core logic of the research agent: the ReAct loop, output parsing,
//! prompt rendering and tool execution.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod error;
mod model_client;
pub mod parser;
pub mod prompt;
pub mod scratchpad;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentOutput, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_PARSE_RETRIES, EarlyStopping, StopReason,
};
pub use error::AgentError;
pub use scratchpad::AgentStep;
