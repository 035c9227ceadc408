//! Core logic of a ReAct agent: the reasoning loop, tool dispatch, prompt
//! composition and completion parsing.
//!
//! An [`Agent`] alternates between asking the model for the next step and
//! running the tool it picked, feeding every result back as an observation
//! until the model commits to a final answer.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
mod config;
pub mod conversation;
mod model_client;
pub mod parser;
pub mod prompt;
pub mod scratchpad;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentError, AgentErrorKind, AgentOutcome,
    EMPTY_INPUT_MESSAGE,
};
pub use config::{
    AgentConfig, AgentConfigBuilder, DEFAULT_MAX_STEPS, DEFAULT_MODEL_TIMEOUT,
};
pub use model_client::{Completion, ModelClient, TransportError};
pub use tool::RegistryError;
pub use tokio_util::sync::CancellationToken;
