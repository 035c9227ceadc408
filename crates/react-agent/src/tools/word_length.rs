use std::future::ready;

use react_agent_core::tool::{Error as ToolError, Tool, ToolResult};

use super::unquote;

/// A tool that counts the characters of a word.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordLengthTool;

impl WordLengthTool {
    /// Creates a new word length tool.
    #[inline]
    pub fn new() -> Self {
        WordLengthTool
    }
}

impl Tool for WordLengthTool {
    fn name(&self) -> &str {
        "get_word_length"
    }

    fn description(&self) -> &str {
        "Returns the length of a word. The input is the word itself."
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let word = unquote(&input);
        let result = if word.is_empty() {
            Err(ToolError::invalid_input().with_reason("the word is empty"))
        } else {
            Ok(word.chars().count().to_string())
        };
        ready(result)
    }
}
