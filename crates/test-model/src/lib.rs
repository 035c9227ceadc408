//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use react_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if this.event_idx < this.events.len() {
                let event = match &this.events[this.event_idx] {
                    PresetEvent::MessageDelta(msg) => {
                        ModelResponseEvent::MessageDelta(msg.clone())
                    }
                };
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(event)));
            } else if this.event_idx == this.events.len() {
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            } else {
                // In case this method is called after completion.
                return Poll::Ready(Ok(None));
            }
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct ScriptState {
    cursor: usize,
    attempts: Vec<u64>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Steps are consumed in call order:
/// the first request gets the first response, and so on. A step with
/// injected failures keeps failing (without being consumed) until its
/// failure budget runs out. If there are no enough steps in the script, an
/// error will be returned.
///
/// Clones share the same cursor and request log, so a clone handed to the
/// agent can be inspected from the test afterwards.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    delay: Option<Duration>,
    state: Arc<Mutex<ScriptState>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Adds a response that streams `text` in one delta.
    #[inline]
    pub fn add_text_response<S: Into<String>>(&mut self, text: S) {
        self.add_response(PresetResponse::text(text));
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, failed attempts included.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_state().requests.clone()
    }

    /// Returns the number of responses consumed so far.
    pub fn consumed(&self) -> usize {
        self.lock_state().cursor
    }

    fn lock_state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_step(&self, req: &ModelRequest) -> Result<PresetResponse, Error> {
        let mut state = self.lock_state();
        state.requests.push(req.clone());

        let step_idx = state.cursor;
        let Some(step) = self.script.get(step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::RateLimitExceeded,
            });
        };

        if state.attempts.len() <= step_idx {
            state.attempts.resize(step_idx + 1, 0);
        }
        state.attempts[step_idx] += 1;
        let attempts = state.attempts[step_idx];

        let failing = match step.failures {
            Some(0) => true,
            Some(failures) => attempts <= failures,
            None => false,
        };
        if failing {
            return Err(Error {
                message: "injected failure",
                kind: ErrorKind::Other,
            });
        }

        state.cursor += 1;
        Ok(step.clone())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let resp = self.next_step(req).map(|step| TestModelResponse {
            events: step.events,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        });
        ready(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    async fn collect_response(resp: TestModelResponse) -> String {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await
                .unwrap()
                .unwrap();
            match event {
                ModelResponseEvent::Completed(_) => break,
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
            }
        }
        msg
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Action: calculator\n".to_owned()),
            PresetEvent::MessageDelta("Action Input: 2+2".to_owned()),
        ]));
        provider.add_text_response("Final Answer: 4");

        let req = ModelRequest::with_prompt("Question: What is 2+2?");
        let resp = provider.send_request(&req).await.unwrap();
        let msg = collect_response(resp).await;
        assert_eq!(msg, "Action: calculator\nAction Input: 2+2");

        let resp = provider.send_request(&req).await.unwrap();
        let msg = collect_response(resp).await;
        assert_eq!(msg, "Final Answer: 4");

        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(provider.consumed(), 2);
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("ok").with_failures(2));

        let shared = provider.clone();
        let req = ModelRequest::with_prompt("hi");
        assert!(provider.send_request(&req).await.is_err());
        assert!(provider.send_request(&req).await.is_err());
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await, "ok");
        assert_eq!(shared.consumed(), 1);
        assert_eq!(shared.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_infinite_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("never").with_failures(0));

        let req = ModelRequest::with_prompt("hi");
        for _ in 0..5 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::Other);
        }
        assert_eq!(provider.consumed(), 0);
    }
}
