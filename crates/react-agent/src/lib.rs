//! An out-of-the-box ReAct agent that assembles the built-in tools and a
//! model provider into chat sessions.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring agent functionality into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod session;
pub mod settings;
pub mod tools;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`react_agent_core`] crate.
pub mod core {
    pub use react_agent_core::*;
}
