use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use crate::tool::{Tool, ToolObject, ToolObjectImpl, ToolResult};

/// Errors caused by registering or resolving tools.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegistryError {
    /// A tool with the same name has already been registered.
    DuplicateTool(String),
    /// No tool is registered under the name.
    UnknownTool(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateTool(name) => {
                write!(f, "duplicate tool: {name}")
            }
            RegistryError::UnknownTool(name) => {
                write!(f, "tool not found: {name}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// A catalog entry describing a registered tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ToolSpec<'a> {
    /// Name of the tool.
    pub name: &'a str,
    /// Description of the tool.
    pub description: &'a str,
}

/// A resolved tool that can be invoked.
#[derive(Clone)]
pub struct ToolHandle(Arc<dyn ToolObject>);

impl ToolHandle {
    /// Returns the name of the tool.
    #[inline]
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Invokes the tool with the given input.
    #[inline]
    pub fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        Arc::clone(&self.0).execute(input)
    }
}

impl Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ToolHandle").field(&self.0.name()).finish()
    }
}

/// A set of named tools, kept in registration order.
///
/// The order matters: it is the order the tools are listed in prompts,
/// and prompts must be reproducible.
#[derive(Clone, Default)]
pub struct Registry {
    tools: Vec<Arc<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Registers a tool, failing if its name is already taken.
    #[inline]
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), RegistryError> {
        self.register_object(Arc::new(ToolObjectImpl(tool)))
    }

    pub(crate) fn register_object(
        &mut self,
        tool: Arc<dyn ToolObject>,
    ) -> Result<(), RegistryError> {
        let name = tool.name().to_owned();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        debug!("registered tool: {name}");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Resolves a tool by name.
    pub fn lookup(&self, name: &str) -> Result<ToolHandle, RegistryError> {
        self.index
            .get(name)
            .map(|&idx| ToolHandle(Arc::clone(&self.tools[idx])))
            .ok_or_else(|| RegistryError::UnknownTool(name.to_owned()))
    }

    /// Returns name and description of every tool, in registration order.
    pub fn catalog(&self) -> impl Iterator<Item = ToolSpec<'_>> {
        self.tools.iter().map(|tool| ToolSpec {
            name: tool.name(),
            description: tool.description(),
        })
    }

    /// Returns the names of every tool, in registration order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.name())
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
