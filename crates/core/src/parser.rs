//! Turns raw model completions into structured steps.
//!
//! The parser only extracts structure. It never evaluates or executes any
//! part of the completion, and it never fails: anything it cannot make
//! sense of becomes [`ParsedStep::ParseFailure`].

pub(crate) const THOUGHT: &str = "Thought:";
pub(crate) const ACTION: &str = "Action:";
pub(crate) const ACTION_INPUT: &str = "Action Input:";
pub(crate) const OBSERVATION: &str = "Observation:";
pub(crate) const FINAL_ANSWER: &str = "Final Answer:";

/// The format the model is expected to follow, restated to the model
/// whenever its output could not be parsed.
pub const FORMAT_REMINDER: &str = "\
Respond with exactly one of the following:
Thought: <your reasoning>
Action: <tool name>
Action Input: <tool input>
or
Thought: <your reasoning>
Final Answer: <the answer to the question>";

/// A request from the model to run a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCall {
    /// Name of the tool to run.
    pub tool_name: String,
    /// The single string argument for the tool.
    pub argument: String,
}

/// The result of parsing one model completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParsedStep {
    /// The model wants to run a tool.
    ToolCall {
        /// Reasoning written before the action.
        thought: String,
        /// The requested call.
        call: ToolCall,
    },
    /// The model has answered.
    FinalAnswer {
        /// Reasoning written before the answer.
        thought: String,
        /// The answer, trimmed.
        answer: String,
    },
    /// The completion does not follow the protocol.
    ParseFailure {
        /// The completion as received.
        raw: String,
        /// Human-readable explanation.
        reason: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    ActionInput,
    Observation,
    FinalAnswer,
}

struct MarkedLine<'a> {
    line_idx: usize,
    marker: Marker,
    rest: &'a str,
}

fn classify(line: &str) -> Option<(Marker, &str)> {
    let line = line.trim_start();
    [
        (Marker::Thought, THOUGHT),
        (Marker::Action, ACTION),
        (Marker::ActionInput, ACTION_INPUT),
        (Marker::Observation, OBSERVATION),
        (Marker::FinalAnswer, FINAL_ANSWER),
    ]
    .into_iter()
    .find_map(|(marker, prefix)| {
        line.strip_prefix(prefix).map(|rest| (marker, rest))
    })
}

/// Parses a model completion.
pub fn parse(completion: &str) -> ParsedStep {
    let failure = |reason: &str| ParsedStep::ParseFailure {
        raw: completion.to_owned(),
        reason: reason.to_owned(),
    };

    if completion.trim().is_empty() {
        return failure("empty output");
    }

    let lines: Vec<&str> = completion.lines().collect();
    let marked: Vec<MarkedLine<'_>> = lines
        .iter()
        .enumerate()
        .filter_map(|(line_idx, line)| {
            classify(line).map(|(marker, rest)| MarkedLine {
                line_idx,
                marker,
                rest,
            })
        })
        .collect();
    let find = |marker: Marker| marked.iter().find(|m| m.marker == marker);
    let count = |marker: Marker| {
        marked.iter().filter(|m| m.marker == marker).count()
    };

    let final_answer = marked
        .iter()
        .rev()
        .find(|m| m.marker == Marker::FinalAnswer);
    let action = find(Marker::Action);

    if let Some(final_answer) = final_answer {
        if action.is_some() || find(Marker::ActionInput).is_some() {
            return failure(
                "ambiguous output containing both Action and Final Answer",
            );
        }
        if marked.iter().any(|m| m.line_idx > final_answer.line_idx) {
            return failure("Final Answer must be the last step");
        }

        let mut answer = final_answer.rest.to_owned();
        for line in &lines[final_answer.line_idx + 1..] {
            answer.push('\n');
            answer.push_str(line);
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return failure("missing text after 'Final Answer:'");
        }
        return ParsedStep::FinalAnswer {
            thought: thought_before(&lines, &marked),
            answer: answer.to_owned(),
        };
    }

    if let Some(action) = action {
        if count(Marker::Action) > 1 {
            return failure("more than one Action in a single step");
        }
        let tool_name = action.rest.trim();
        if tool_name.is_empty() {
            return failure("missing tool name after 'Action:'");
        }
        let Some(input) = marked.iter().find(|m| {
            m.marker == Marker::ActionInput && m.line_idx > action.line_idx
        }) else {
            return failure("missing 'Action Input:' after 'Action:'");
        };
        return ParsedStep::ToolCall {
            thought: thought_before(&lines, &marked),
            call: ToolCall {
                tool_name: tool_name.to_owned(),
                argument: input.rest.trim().to_owned(),
            },
        };
    }

    if find(Marker::ActionInput).is_some() {
        return failure("missing 'Action:' before 'Action Input:'");
    }
    failure("missing 'Action:' or 'Final Answer:' after 'Thought:'")
}

/// Collects the free text (and any `Thought:` lines) that precedes the
/// first protocol marker.
fn thought_before(lines: &[&str], marked: &[MarkedLine<'_>]) -> String {
    let end = marked
        .iter()
        .find(|m| m.marker != Marker::Thought)
        .map_or(lines.len(), |m| m.line_idx);
    let mut thought = String::new();
    for line in &lines[..end] {
        let line = match classify(line) {
            Some((Marker::Thought, rest)) => rest,
            _ => line,
        };
        if !thought.is_empty() {
            thought.push('\n');
        }
        thought.push_str(line.trim());
    }
    thought.trim().to_owned()
}
