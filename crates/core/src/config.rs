//! Agent configuration.

use std::time::Duration;

use crate::conversation::HistoryWindow;

/// Default upper bound of loop iterations in one turn.
pub const DEFAULT_MAX_STEPS: usize = 10;
/// Default time budget of one model call.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for [`AgentConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentConfigBuilder {
    max_steps: Option<usize>,
    model_timeout: Option<Duration>,
    history_window: Option<HistoryWindow>,
    stop_sequences: Option<Vec<String>>,
}

impl AgentConfigBuilder {
    /// Creates a builder with every option unset.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many model calls a turn may make before giving up.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Sets how long a single model call may take.
    #[inline]
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    /// Sets how much history is rendered into prompts.
    #[inline]
    pub fn with_history_window(mut self, window: HistoryWindow) -> Self {
        self.history_window = Some(window);
        self
    }

    /// Replaces the stop sequences sent with every model request.
    #[inline]
    pub fn with_stop_sequences<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_sequences = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> AgentConfig {
        let max_steps = match self.max_steps {
            Some(0) => {
                warn!("max_steps must be at least 1, using 1");
                1
            }
            Some(max_steps) => max_steps,
            None => DEFAULT_MAX_STEPS,
        };
        AgentConfig {
            max_steps,
            model_timeout: self.model_timeout.unwrap_or(DEFAULT_MODEL_TIMEOUT),
            history_window: self.history_window.unwrap_or_default(),
            stop_sequences: self
                .stop_sequences
                .unwrap_or_else(|| vec!["\nObservation:".to_owned()]),
        }
    }
}

/// Process-wide agent settings, fixed once the agent is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    pub(crate) max_steps: usize,
    pub(crate) model_timeout: Duration,
    pub(crate) history_window: HistoryWindow,
    pub(crate) stop_sequences: Vec<String>,
}

impl AgentConfig {
    /// Upper bound of model calls in one turn.
    #[inline]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Time budget of a single model call.
    #[inline]
    pub fn model_timeout(&self) -> Duration {
        self.model_timeout
    }

    /// The history window applied to prompts.
    #[inline]
    pub fn history_window(&self) -> &HistoryWindow {
        &self.history_window
    }

    /// Stop sequences sent with every model request.
    #[inline]
    pub fn stop_sequences(&self) -> &[String] {
        &self.stop_sequences
    }
}

impl Default for AgentConfig {
    #[inline]
    fn default() -> Self {
        AgentConfigBuilder::new().build()
    }
}
