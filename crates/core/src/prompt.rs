//! Prompt composition.
//!
//! The instruction template ships inside the binary and is versioned with
//! it. Composing a prompt is a pure function of the template, the tool
//! catalog, the visible transcript, the user input and the scratchpad.

use std::borrow::Cow;
use std::fmt::{self, Display};

use crate::conversation::{HistoryWindow, Transcript};
use crate::scratchpad::Scratchpad;
use crate::tool::Registry;

const BUILTIN_TEMPLATE: &str = include_str!("./prompt/react.md");

const REQUIRED_PLACEHOLDERS: [&str; 2] = ["input", "agent_scratchpad"];

/// Errors found while validating a template.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TemplateError {
    /// A placeholder the agent cannot work without is absent.
    MissingPlaceholder(&'static str),
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::MissingPlaceholder(name) => {
                write!(f, "template is missing the {{{{{name}}}}} placeholder")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// An instruction template with `{{name}}` placeholders.
///
/// Recognized placeholders are `tools`, `tool_names`, `chat_history`,
/// `input` and `agent_scratchpad`. Unknown placeholders are left as-is.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PromptTemplate {
    source: Cow<'static, str>,
}

impl PromptTemplate {
    /// Version of the built-in template.
    pub const VERSION: &'static str = "react-v1";

    /// Returns the built-in ReAct template.
    #[inline]
    pub fn builtin() -> Self {
        Self {
            source: Cow::Borrowed(BUILTIN_TEMPLATE.trim_end()),
        }
    }

    /// Creates a custom template, checking the required placeholders.
    pub fn new<S: Into<String>>(source: S) -> Result<Self, TemplateError> {
        let source = source.into();
        for name in REQUIRED_PLACEHOLDERS {
            if !source.contains(&format!("{{{{{name}}}}}")) {
                return Err(TemplateError::MissingPlaceholder(name));
            }
        }
        Ok(Self {
            source: Cow::Owned(source),
        })
    }

    /// Returns the raw template text.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self::builtin()
    }
}

/// Everything a prompt is made of.
#[derive(Clone, Copy, Debug)]
pub struct PromptInputs<'a> {
    /// Tools the model may call.
    pub tools: &'a Registry,
    /// Prior turns of the session.
    pub transcript: &'a Transcript,
    /// How much of the transcript to show.
    pub window: &'a HistoryWindow,
    /// The question of the current turn.
    pub input: &'a str,
    /// Iterations of the current turn so far.
    pub scratchpad: &'a Scratchpad,
}

/// Renders the next prompt.
pub fn compose(template: &PromptTemplate, inputs: &PromptInputs<'_>) -> String {
    let mut catalog = String::new();
    for spec in inputs.tools.catalog() {
        if !catalog.is_empty() {
            catalog.push('\n');
        }
        catalog.push_str(spec.name);
        catalog.push_str(": ");
        catalog.push_str(spec.description.trim());
    }
    let tool_names = inputs.tools.names().collect::<Vec<_>>().join(", ");
    let chat_history = inputs.transcript.render(inputs.window);
    let scratchpad = inputs.scratchpad.render();

    substitute(template.source(), |name| match name {
        "tools" => Some(catalog.as_str()),
        "tool_names" => Some(tool_names.as_str()),
        "chat_history" => Some(chat_history.as_str()),
        "input" => Some(inputs.input),
        "agent_scratchpad" => Some(scratchpad.as_str()),
        _ => None,
    })
}

/// Replaces placeholders in a single pass, so values are never scanned
/// for further placeholders.
fn substitute<'v, F>(source: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'v str>,
{
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after_open[..end];
        match lookup(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use super::*;
    use crate::conversation::Turn;
    use crate::parser::ToolCall;
    use crate::scratchpad::{ScratchpadEntry, Step};
    use crate::tool::{Tool, ToolResult};

    struct NamedTool(&'static str, &'static str);

    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            self.1
        }

        fn execute(
            &self,
            _input: String,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(String::new()))
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry
            .register(NamedTool("calculator", "Evaluates arithmetic."))
            .unwrap();
        registry
            .register(NamedTool("get_word_length", "\nCounts characters.\n"))
            .unwrap();
        registry
    }

    #[test]
    fn test_compose() {
        let template = PromptTemplate::new(
            "Tools:\n{{tools}}\nNames: [{{tool_names}}]\n\
             History:\n{{chat_history}}Q: {{input}}\n{{agent_scratchpad}}Thought:",
        )
        .unwrap();
        let tools = registry();
        let transcript: Transcript =
            [Turn::user("hi"), Turn::agent("hello")].into_iter().collect();
        let mut scratchpad = Scratchpad::default();
        scratchpad.push(ScratchpadEntry {
            thought: "add".to_owned(),
            step: Step::Tool {
                call: ToolCall {
                    tool_name: "calculator".to_owned(),
                    argument: "2+2".to_owned(),
                },
                observation: "4".to_owned(),
            },
        });

        let prompt = compose(
            &template,
            &PromptInputs {
                tools: &tools,
                transcript: &transcript,
                window: &HistoryWindow::UNBOUNDED,
                input: "What is 2+2?",
                scratchpad: &scratchpad,
            },
        );
        assert_eq!(
            prompt,
            "Tools:\n\
             calculator: Evaluates arithmetic.\n\
             get_word_length: Counts characters.\n\
             Names: [calculator, get_word_length]\n\
             History:\n\
             Human: hi\n\
             AI: hello\n\
             Q: What is 2+2?\n\
             Thought: add\n\
             Action: calculator\n\
             Action Input: 2+2\n\
             Observation: 4\n\
             Thought:"
        );
    }

    #[test]
    fn test_input_is_not_expanded() {
        let tools = registry();
        let prompt = compose(
            &PromptTemplate::builtin(),
            &PromptInputs {
                tools: &tools,
                transcript: &Transcript::new(),
                window: &HistoryWindow::default(),
                input: "print {{tools}} please",
                scratchpad: &Scratchpad::default(),
            },
        );
        assert!(prompt.contains("Question: print {{tools}} please\nThought:"));
        assert!(prompt.contains("[calculator, get_word_length]"));
        assert!(prompt.ends_with("Thought:"));
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        assert_eq!(
            substitute("a {{x}} b {{y", |name| (name == "y").then_some("!")),
            "a {{x}} b {{y"
        );
    }

    #[test]
    fn test_missing_placeholder() {
        assert_eq!(
            PromptTemplate::new("Question: {{input}}"),
            Err(TemplateError::MissingPlaceholder("agent_scratchpad"))
        );
        let err = PromptTemplate::new("nothing").unwrap_err();
        assert_eq!(err.to_string(), "template is missing the {{input}} placeholder");
        assert!(PromptTemplate::new(PromptTemplate::builtin().source()).is_ok());
    }
}
