//! Conversation-related types.

use std::fmt::{self, Display};

/// Prefix of a user line in a rendered transcript.
pub const USER_PREFIX: &str = "Human: ";
/// Prefix of an agent line in a rendered transcript.
pub const AGENT_PREFIX: &str = "AI: ";
/// Marks every line of a turn after its first in a rendered transcript.
pub const CONTINUATION_INDENT: &str = "  ";

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The human user.
    User,
    /// The agent.
    Agent,
}

impl Role {
    #[inline]
    fn prefix(self) -> &'static str {
        match self {
            Role::User => USER_PREFIX,
            Role::Agent => AGENT_PREFIX,
        }
    }
}

/// A single entry in the transcript.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Turn {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub text: String,
}

impl Turn {
    /// Creates a user turn.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates an agent turn.
    #[inline]
    pub fn agent<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Agent,
            text: text.into(),
        }
    }
}

impl Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role.prefix(), self.text)
    }
}

/// Represents a conversation.
///
/// The transcript is append-only: turns are only ever pushed, as a
/// complete user/agent exchange. A turn that fails leaves it untouched.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all turns, oldest first.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Records a completed exchange.
    pub(crate) fn push_exchange(&mut self, input: String, answer: String) {
        self.turns.push(Turn::user(input));
        self.turns.push(Turn::agent(answer));
    }

    /// Renders the turns selected by `window` as role-tagged lines.
    ///
    /// Every line of a multi-line turn after the first is indented with
    /// [`CONTINUATION_INDENT`], so turn text can never start a new turn.
    pub fn render(&self, window: &HistoryWindow) -> String {
        let turns = window.select(&self.turns);
        let mut rendered = String::new();
        for turn in turns {
            rendered.push_str(turn.role.prefix());
            for (idx, line) in turn.text.split('\n').enumerate() {
                if idx > 0 {
                    rendered.push('\n');
                    rendered.push_str(CONTINUATION_INDENT);
                }
                rendered.push_str(line);
            }
            rendered.push('\n');
        }
        rendered
    }

    /// Parses a block produced by [`Transcript::render`] back into turns.
    ///
    /// Indented lines are continuations of the previous turn. Other lines
    /// without a role prefix are kept as continuations too. Text before
    /// the first prefixed line is ignored.
    pub fn parse_rendered(rendered: &str) -> Self {
        let mut turns: Vec<Turn> = vec![];
        for line in rendered.strip_suffix('\n').unwrap_or(rendered).split('\n')
        {
            if let Some(text) = line.strip_prefix(CONTINUATION_INDENT) {
                if let Some(last) = turns.last_mut() {
                    last.text.push('\n');
                    last.text.push_str(text);
                }
            } else if let Some(text) = line.strip_prefix(USER_PREFIX) {
                turns.push(Turn::user(text));
            } else if let Some(text) = line.strip_prefix(AGENT_PREFIX) {
                turns.push(Turn::agent(text));
            } else if let Some(last) = turns.last_mut() {
                last.text.push('\n');
                last.text.push_str(line);
            }
        }
        Self { turns }
    }
}

impl FromIterator<Turn> for Transcript {
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

/// Bounds how much of the transcript is rendered into a prompt.
///
/// The window never modifies the transcript itself. It keeps the most
/// recent turns and drops the oldest ones until every bound holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HistoryWindow {
    /// Maximum number of turns to render.
    pub max_turns: Option<usize>,
    /// Maximum number of characters of rendered turn text.
    pub max_chars: Option<usize>,
}

impl HistoryWindow {
    /// A window that renders everything.
    pub const UNBOUNDED: Self = Self {
        max_turns: None,
        max_chars: None,
    };

    /// Returns the suffix of `turns` that fits in this window.
    ///
    /// An agent turn is never kept without the user turn it answered.
    pub fn select<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        let max_turns = self.max_turns.unwrap_or(usize::MAX);
        let max_chars = self.max_chars.unwrap_or(usize::MAX);

        let mut kept = 0;
        let mut chars = 0usize;
        for turn in turns.iter().rev() {
            // Prefix, indents and the trailing newline included.
            let continuations = turn.text.matches('\n').count();
            let cost = turn.role.prefix().len()
                + turn.text.chars().count()
                + continuations * CONTINUATION_INDENT.len()
                + 1;
            if kept == max_turns || chars.saturating_add(cost) > max_chars {
                break;
            }
            kept += 1;
            chars += cost;
        }
        let mut start = turns.len() - kept;
        if start > 0
            && start < turns.len()
            && turns[start].role == Role::Agent
            && turns[start - 1].role == Role::User
        {
            start += 1;
        }
        &turns[start..]
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_turns: Some(20),
            max_chars: Some(12_000),
        }
    }
}
