use std::sync::{Mutex, PoisonError};

use react_agent_core::conversation::Transcript;
use react_agent_core::prompt::PromptTemplate;
use react_agent_core::scratchpad::ScratchpadEntry;
use react_agent_core::tool::Tool;
use react_agent_core::{
    Agent, AgentBuilder, AgentConfig, AgentOutcome, CancellationToken,
    RegistryError,
};
use react_agent_model::ModelProvider;

use crate::tools::*;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self { agent_builder }
    }

    /// Sets the agent configuration.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.agent_builder = self.agent_builder.with_config(config);
        self
    }

    /// Replaces the built-in instruction template.
    #[inline]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.agent_builder = self.agent_builder.with_template(template);
        self
    }

    /// Registers an extra tool next to the built-in ones.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.agent_builder = self.agent_builder.with_tool(tool);
        self
    }

    /// Attaches a callback to be invoked when a reasoning step is recorded.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&ScratchpadEntry) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_step(on_step);
        self
    }

    /// Attaches a callback to be invoked when the model streams text.
    #[inline]
    pub fn on_model_delta(
        mut self,
        on_model_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_model_delta(on_model_delta);
        self
    }

    /// Builds a new session with the built-in tools registered.
    pub fn build(self) -> Result<Session, RegistryError> {
        let agent = self
            .agent_builder
            .with_tool(WordLengthTool::new())
            .with_tool(CalculatorTool::new())
            .build()?;

        Ok(Session::new(agent))
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session owns the conversation transcript and runs one turn at a
/// time: a message sent while another turn is in flight waits for it to
/// finish. Sessions created by [`Session::fork`] share the agent but not
/// the transcript, so they run independently.
pub struct Session {
    agent: Agent,
    transcript: tokio::sync::Mutex<Transcript>,
    cancel_token: Mutex<CancellationToken>,
}

impl Session {
    /// Creates an empty session around an existing agent.
    #[inline]
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            transcript: Default::default(),
            cancel_token: Default::default(),
        }
    }

    /// Sends a message to the session and waits for the outcome.
    pub async fn send_message(&self, message: &str) -> AgentOutcome {
        let mut transcript = self.transcript.lock().await;

        let cancel_token = CancellationToken::new();
        *self.lock_cancel_token() = cancel_token.clone();
        debug!("starting a turn after {} turns", transcript.len());

        self.agent
            .run_with_cancel(message, &mut transcript, &cancel_token)
            .await
    }

    /// Cancels the turn in flight.
    ///
    /// The turn stops before its next model call and reports
    /// [`Cancelled`](react_agent_core::AgentErrorKind::Cancelled). Messages
    /// sent afterwards are not affected.
    pub fn cancel(&self) {
        debug!("cancelling the turn in flight");
        self.lock_cancel_token().cancel();
    }

    /// Returns a snapshot of the transcript.
    ///
    /// Waits for the turn in flight, if any.
    pub async fn transcript(&self) -> Transcript {
        self.transcript.lock().await.clone()
    }

    /// Creates a new empty session backed by the same agent.
    #[inline]
    pub fn fork(&self) -> Session {
        Session::new(self.agent.clone())
    }

    /// The agent behind this session.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    fn lock_cancel_token(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.cancel_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
