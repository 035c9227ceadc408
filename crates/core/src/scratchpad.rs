//! The reasoning trace of a single turn.

use crate::parser::{ACTION, ACTION_INPUT, OBSERVATION, THOUGHT, ToolCall};

/// What happened in one iteration of the loop.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// A tool was requested. The observation is the tool output, or the
    /// error text if the tool failed or does not exist.
    Tool {
        /// The requested call.
        call: ToolCall,
        /// What the model gets to see next.
        observation: String,
    },
    /// The completion could not be parsed. The observation tells the model
    /// what went wrong and how to fix it.
    Malformed {
        /// The completion as received.
        raw: String,
        /// The corrective message.
        observation: String,
    },
}

/// One iteration of the loop.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScratchpadEntry {
    /// Reasoning the model wrote in this iteration.
    pub thought: String,
    /// The outcome of the iteration.
    pub step: Step,
}

impl ScratchpadEntry {
    /// Returns the tool call, if this entry is a tool step.
    #[inline]
    pub fn action(&self) -> Option<&ToolCall> {
        match &self.step {
            Step::Tool { call, .. } => Some(call),
            Step::Malformed { .. } => None,
        }
    }

    /// Returns the observation fed back to the model.
    #[inline]
    pub fn observation(&self) -> &str {
        match &self.step {
            Step::Tool { observation, .. }
            | Step::Malformed { observation, .. } => observation,
        }
    }

    fn render_into(&self, out: &mut String) {
        match &self.step {
            Step::Tool { call, observation } => {
                out.push_str(THOUGHT);
                if !self.thought.is_empty() {
                    out.push(' ');
                    out.push_str(&self.thought);
                }
                out.push('\n');
                push_line(out, ACTION, &call.tool_name);
                push_line(out, ACTION_INPUT, &call.argument);
                push_line(out, OBSERVATION, observation);
            }
            Step::Malformed { raw, observation } => {
                let raw = raw.trim();
                out.push_str(THOUGHT);
                if !raw.is_empty() {
                    out.push(' ');
                    out.push_str(raw);
                }
                out.push('\n');
                push_line(out, OBSERVATION, observation);
            }
        }
    }
}

#[inline]
fn push_line(out: &mut String, marker: &str, value: &str) {
    out.push_str(marker);
    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

/// The ordered entries of the current turn.
///
/// A scratchpad lives only as long as its turn; only the final answer
/// makes it into the transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    /// Returns every entry, oldest first.
    #[inline]
    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no iteration has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub(crate) fn push(&mut self, entry: ScratchpadEntry) {
        self.entries.push(entry);
    }

    /// Renders every entry as protocol lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            entry.render_into(&mut out);
        }
        out
    }
}
