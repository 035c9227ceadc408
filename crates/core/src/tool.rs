//! Tool call supports.
//!
//! A tool is a named capability that takes a single string argument and
//! produces a string result. Tools are registered once when the agent is
//! built and never change afterwards.

mod error;
mod object;
mod registry;

pub use error::{Error, ErrorKind};
pub(crate) use object::{ToolObject, ToolObjectImpl};
pub use registry::{Registry, RegistryError, ToolHandle, ToolSpec};

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as the working directory or the
/// current user. To do this, make the context an immutable state of the tool,
/// which can be set during initialization, and copy it when executing.
pub trait Tool: Send + Sync + 'static {
    /// Returns the name of the tool.
    ///
    /// This is what the model writes after `Action:`, so it should be a
    /// single word.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Executes the tool with the given input.
    ///
    /// The input is the text the model wrote after `Action Input:`,
    /// trimmed. This method must return a future that is fully independent
    /// of `self`.
    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
