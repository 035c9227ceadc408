mod builder;
mod state;

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::AgentConfig;
use crate::conversation::Transcript;
use crate::model_client::ModelClient;
use crate::prompt::PromptTemplate;
use crate::scratchpad::ScratchpadEntry;
use crate::tool::Registry;
pub use builder::AgentBuilder;
use state::TurnState;

/// Message returned when a turn is started with blank input.
pub const EMPTY_INPUT_MESSAGE: &str = "Please provide a valid input string.";

/// Why a turn ended without an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentErrorKind {
    /// The input was empty or whitespace only.
    EmptyInput,
    /// The model could not be reached or did not answer in time.
    ModelUnavailable,
    /// The loop hit `max_steps` without reaching a final answer.
    StepLimitExceeded,
    /// The turn was cancelled by the caller.
    Cancelled,
}

impl Display for AgentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentErrorKind::EmptyInput => write!(f, "empty input"),
            AgentErrorKind::ModelUnavailable => write!(f, "model unavailable"),
            AgentErrorKind::StepLimitExceeded => {
                write!(f, "step limit exceeded")
            }
            AgentErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A failed turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AgentError {
    kind: AgentErrorKind,
    detail: String,
}

impl AgentError {
    #[inline]
    pub(crate) fn new<S: Into<String>>(kind: AgentErrorKind, detail: S) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> AgentErrorKind {
        self.kind
    }

    /// Returns the human-readable detail.
    #[inline]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for AgentError {}

/// The result of one turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AgentOutcome {
    /// The model produced a final answer.
    Answer(String),
    /// The turn failed.
    Error(AgentError),
}

impl AgentOutcome {
    /// Returns the answer, if there is one.
    #[inline]
    pub fn answer(&self) -> Option<&str> {
        match self {
            AgentOutcome::Answer(answer) => Some(answer),
            AgentOutcome::Error(_) => None,
        }
    }

    /// Returns the error, if there is one.
    #[inline]
    pub fn error(&self) -> Option<&AgentError> {
        match self {
            AgentOutcome::Answer(_) => None,
            AgentOutcome::Error(err) => Some(err),
        }
    }

    /// Converts the outcome into a `Result`.
    #[inline]
    pub fn into_result(self) -> Result<String, AgentError> {
        match self {
            AgentOutcome::Answer(answer) => Ok(answer),
            AgentOutcome::Error(err) => Err(err),
        }
    }
}

type StepObserver = Arc<dyn Fn(&ScratchpadEntry) + Send + Sync>;
type DeltaObserver = Arc<dyn Fn(&str) + Send + Sync>;

pub(crate) struct AgentInner {
    model_client: ModelClient,
    tools: Registry,
    template: PromptTemplate,
    config: AgentConfig,
    on_step: Option<StepObserver>,
    on_model_delta: Option<DeltaObserver>,
}

/// A ReAct agent: a model, a set of tools and the loop that connects them.
///
/// The agent itself holds no conversation state. Every call to
/// [`Agent::run`] works on a caller-owned [`Transcript`], so one agent can
/// serve any number of sessions concurrently. Cloning is cheap.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    /// Runs one turn to completion.
    ///
    /// On success the input and the answer are appended to `transcript`.
    /// On failure `transcript` is left untouched.
    pub async fn run(
        &self,
        input: &str,
        transcript: &mut Transcript,
    ) -> AgentOutcome {
        self.run_with_cancel(input, transcript, &CancellationToken::new())
            .await
    }

    /// Runs one turn, stopping early once `cancel` is triggered.
    ///
    /// Cancellation is observed before every model call. A model call or
    /// tool execution that is already in flight runs to completion.
    pub async fn run_with_cancel(
        &self,
        input: &str,
        transcript: &mut Transcript,
        cancel: &CancellationToken,
    ) -> AgentOutcome {
        let input = input.trim();
        if input.is_empty() {
            debug!("rejected empty input");
            return AgentOutcome::Error(AgentError::new(
                AgentErrorKind::EmptyInput,
                EMPTY_INPUT_MESSAGE,
            ));
        }

        let span = debug_span!("agent turn", history = transcript.len());
        let turn = TurnState::new(&self.inner, input, transcript);
        let result = turn.run(cancel).instrument(span).await;
        match result {
            Ok(answer) => {
                transcript.push_exchange(input.to_owned(), answer.clone());
                AgentOutcome::Answer(answer)
            }
            Err(err) => {
                info!("turn failed: {err}");
                AgentOutcome::Error(err)
            }
        }
    }

    /// Tools available to the model.
    #[inline]
    pub fn tools(&self) -> &Registry {
        &self.inner.tools
    }

    /// The configuration the agent was built with.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    /// The instruction template.
    #[inline]
    pub fn template(&self) -> &PromptTemplate {
        &self.inner.template
    }
}

impl Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("tools", &self.inner.tools)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
