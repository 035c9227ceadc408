/// A request to be sent to the model provider.
///
/// The whole reasoning context is rendered into a single prompt string
/// by the agent, so providers never see structured history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The fully rendered prompt.
    pub prompt: String,
    /// Sequences at which the model should stop generating.
    ///
    /// The stop sequence itself is not part of the completion.
    pub stop: Vec<String>,
}

impl ModelRequest {
    /// Creates a request with the given prompt and no stop sequences.
    #[inline]
    pub fn with_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            prompt: prompt.into(),
            stop: vec![],
        }
    }

    /// Appends a stop sequence.
    #[inline]
    pub fn with_stop<S: Into<String>>(mut self, stop: S) -> Self {
        self.stop.push(stop.into());
        self
    }
}
