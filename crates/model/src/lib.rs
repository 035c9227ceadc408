//! An abstraction layer for different LLMs.
//!
//! This crate establishes the protocol the agent uses to talk to a text
//! completion model: a prompt goes in, a stream of text deltas comes
//! out. The agent core only relies on these types, so providers can be
//! swapped without touching the reasoning loop.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
