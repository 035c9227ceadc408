use std::fmt::{self, Debug};

use react_agent_model::ModelRequest;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{AgentError, AgentErrorKind, AgentInner};
use crate::conversation::Transcript;
use crate::model_client::Completion;
use crate::parser::{FORMAT_REMINDER, ParsedStep, ToolCall, parse};
use crate::prompt::{PromptInputs, compose};
use crate::scratchpad::{Scratchpad, ScratchpadEntry, Step};
use crate::tool::RegistryError;

/// Where the loop is within a turn.
enum TurnStage {
    /// About to ask the model for the next step.
    Reasoning,
    /// Running the tool the model asked for.
    Acting { thought: String, call: ToolCall },
    /// Recording an iteration before reasoning again.
    Observing(ScratchpadEntry),
    /// The turn is over.
    Done(Result<String, AgentError>),
}

impl Debug for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnStage::Reasoning => write!(f, "Reasoning"),
            TurnStage::Acting { call, .. } => {
                write!(f, "Acting({})", call.tool_name)
            }
            TurnStage::Observing(_) => write!(f, "Observing"),
            TurnStage::Done(Ok(_)) => write!(f, "Done"),
            TurnStage::Done(Err(err)) => write!(f, "Done({})", err.kind()),
        }
    }
}

/// State of a single turn. It lives only as long as the turn.
pub(super) struct TurnState<'a> {
    agent: &'a AgentInner,
    input: &'a str,
    transcript: &'a Transcript,
    scratchpad: Scratchpad,
    steps_taken: usize,
}

impl<'a> TurnState<'a> {
    #[inline]
    pub(super) fn new(
        agent: &'a AgentInner,
        input: &'a str,
        transcript: &'a Transcript,
    ) -> Self {
        Self {
            agent,
            input,
            transcript,
            scratchpad: Scratchpad::default(),
            steps_taken: 0,
        }
    }

    /// Drives the loop until it produces an answer or fails.
    pub(super) async fn run(
        mut self,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let mut stage = TurnStage::Reasoning;
        loop {
            trace!("stage: {stage:?}");
            stage = match stage {
                TurnStage::Reasoning => self.reason(cancel).await,
                TurnStage::Acting { thought, call } => {
                    let observation = self.act(&call).await;
                    TurnStage::Observing(ScratchpadEntry {
                        thought,
                        step: Step::Tool { call, observation },
                    })
                }
                TurnStage::Observing(entry) => {
                    self.observe(entry);
                    TurnStage::Reasoning
                }
                TurnStage::Done(result) => return result,
            };
        }
    }

    async fn reason(&mut self, cancel: &CancellationToken) -> TurnStage {
        if cancel.is_cancelled() {
            return TurnStage::Done(Err(AgentError::new(
                AgentErrorKind::Cancelled,
                format!("cancelled after {} steps", self.steps_taken),
            )));
        }
        let max_steps = self.agent.config.max_steps;
        if self.steps_taken >= max_steps {
            return TurnStage::Done(Err(AgentError::new(
                AgentErrorKind::StepLimitExceeded,
                format!("no final answer within {max_steps} steps"),
            )));
        }
        self.steps_taken += 1;

        let completion = match self.complete().await {
            Ok(completion) => completion,
            Err(err) => return TurnStage::Done(Err(err)),
        };

        match parse(&completion.text) {
            ParsedStep::FinalAnswer { answer, .. } => {
                debug!("got final answer at step {}", self.steps_taken);
                TurnStage::Done(Ok(answer))
            }
            ParsedStep::ToolCall { thought, call } => {
                TurnStage::Acting { thought, call }
            }
            ParsedStep::ParseFailure { raw, reason } => {
                warn!("unparsable completion: {reason}");
                TurnStage::Observing(ScratchpadEntry {
                    thought: String::new(),
                    step: Step::Malformed {
                        raw,
                        observation: format!(
                            "Invalid Format: {reason}.\n{FORMAT_REMINDER}"
                        ),
                    },
                })
            }
        }
    }

    async fn complete(&self) -> Result<Completion, AgentError> {
        let config = &self.agent.config;
        let prompt = compose(
            &self.agent.template,
            &PromptInputs {
                tools: &self.agent.tools,
                transcript: self.transcript,
                window: &config.history_window,
                input: self.input,
                scratchpad: &self.scratchpad,
            },
        );
        let request = ModelRequest {
            prompt,
            stop: config.stop_sequences.clone(),
        };

        let on_model_delta = self.agent.on_model_delta.clone();
        let span = debug_span!("model call", step = self.steps_taken);
        self.agent
            .model_client
            .complete(request, config.model_timeout, move |delta| {
                if let Some(on_model_delta) = &on_model_delta {
                    on_model_delta(&delta);
                }
            })
            .instrument(span)
            .await
            .map_err(|err| {
                error!("model call failed: {err}");
                AgentError::new(AgentErrorKind::ModelUnavailable, err.to_string())
            })
    }

    async fn act(&self, call: &ToolCall) -> String {
        let tool = match self.agent.tools.lookup(&call.tool_name) {
            Ok(tool) => tool,
            Err(RegistryError::UnknownTool(name)) => {
                warn!("model asked for unknown tool: {name}");
                let available =
                    self.agent.tools.names().collect::<Vec<_>>().join(", ");
                return format!(
                    "tool not found: {name}. Available tools: {available}"
                );
            }
            Err(err) => return err.to_string(),
        };
        match tool.execute(call.argument.clone()).await {
            Ok(output) => output,
            Err(err) => {
                info!("tool {} failed: {err}", call.tool_name);
                err.to_string()
            }
        }
    }

    fn observe(&mut self, entry: ScratchpadEntry) {
        if let Some(on_step) = &self.agent.on_step {
            on_step(&entry);
        }
        self.scratchpad.push(entry);
    }
}
