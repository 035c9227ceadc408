//! Settings read from environment variables.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use react_agent_core::conversation::HistoryWindow;
use react_agent_core::{AgentConfig, AgentConfigBuilder};
use react_agent_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

/// API key for the OpenAI-compatible endpoint.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Endpoint base URL.
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
/// Model name.
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
/// Upper bound of loop iterations per turn.
pub const MAX_STEPS: &str = "REACT_AGENT_MAX_STEPS";
/// Time budget of a single model call, in seconds.
pub const MODEL_TIMEOUT_SECS: &str = "REACT_AGENT_MODEL_TIMEOUT_SECS";
/// Number of past turns rendered into prompts.
pub const HISTORY_TURNS: &str = "REACT_AGENT_HISTORY_TURNS";

/// A variable is missing or malformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable could not be parsed.
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Missing(name) => {
                write!(f, "{name} environment variable is not set")
            }
            SettingsError::Invalid { name, value } => {
                write!(f, "{name} has an invalid value: {value:?}")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Reads the provider configuration.
///
/// `lookup` returns the value of a variable, usually `std::env::var`.
pub fn openai_config<F>(lookup: F) -> Result<OpenAIConfig, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = lookup(OPENAI_API_KEY)
        .filter(|key| !key.is_empty())
        .ok_or(SettingsError::Missing(OPENAI_API_KEY))?;
    let mut builder = OpenAIConfigBuilder::with_api_key(api_key);
    if let Some(base_url) = lookup(OPENAI_BASE_URL) {
        builder = builder.with_base_url(base_url);
    }
    if let Some(model) = lookup(OPENAI_MODEL) {
        builder = builder.with_model(model);
    }
    Ok(builder.build())
}

/// Reads the agent configuration. Unset variables keep their defaults.
pub fn agent_config<F>(lookup: F) -> Result<AgentConfig, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = AgentConfigBuilder::new();
    if let Some(max_steps) = parse::<usize, _>(&lookup, MAX_STEPS)? {
        builder = builder.with_max_steps(max_steps);
    }
    if let Some(secs) = parse::<u64, _>(&lookup, MODEL_TIMEOUT_SECS)? {
        builder = builder.with_model_timeout(Duration::from_secs(secs));
    }
    if let Some(turns) = parse::<usize, _>(&lookup, HISTORY_TURNS)? {
        builder = builder.with_history_window(HistoryWindow {
            max_turns: Some(turns),
            ..HistoryWindow::default()
        });
    }
    Ok(builder.build())
}

fn parse<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, SettingsError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| SettingsError::Invalid { name, value })
}
