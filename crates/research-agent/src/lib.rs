//! An expert research assistant that answers questions with a hosted model,
//! searching the web whenever the answer needs current or external facts.
//!
//! The crate includes a CLI tool for chatting in the terminal. And you can
//! also use it as a library to bring the assistant into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
mod session;
pub mod tools;

pub use config::{
    ConfigError, CredentialStatus, ResearchConfig, ResearchConfigBuilder,
};
pub use session::{GREETING, Session, SessionBuilder};

/// Re-exports of [`research_agent_core`] crate.
pub mod core {
    pub use research_agent_core::*;
}
