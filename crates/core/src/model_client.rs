use std::fmt::{self, Display};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use react_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type SendRequestResult = Result<Completion, TransportError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Box<dyn Fn(String) + Send + 'static>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// Why a model call did not produce a completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransportError {
    /// The provider reported an error.
    Provider {
        /// Kind reported by the provider.
        kind: ErrorKind,
        /// The provider's message.
        message: String,
    },
    /// The call did not finish in time.
    Timeout(Duration),
}

impl TransportError {
    fn from_provider<E: ModelProviderError>(err: E) -> Self {
        TransportError::Provider {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Provider { kind, message } => {
                write!(f, "{kind}: {message}")
            }
            TransportError::Timeout(timeout) => {
                write!(f, "no response within {timeout:?}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Wraps a provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_delta).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and collects the whole completion.
    ///
    /// `timeout` covers the entire exchange, from sending the request to
    /// receiving the last delta. Every delta is also passed to `on_delta`
    /// as it arrives.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn complete(
        &self,
        req: ModelRequest,
        timeout: Duration,
        on_delta: impl Fn(String) + Send + 'static,
    ) -> Result<Completion, TransportError> {
        let fut = (self.handler_fn)(req, Box::new(on_delta));
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("model call timed out after {timeout:?}");
                Err(TransportError::Timeout(timeout))
            }
        }
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The completion text.
    pub text: String,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_delta: Box<dyn Fn(String) + Send + 'static>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(TransportError::from_provider(err));
        }
    };

    let mut text = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(TransportError::from_provider(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                text.push_str(&delta);
                on_delta(delta);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");
    if finish_reason == Some(ModelFinishReason::Length) {
        warn!("completion was cut off by the output limit");
    }

    Ok(Completion {
        text,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use react_agent_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    #[tokio::test]
    async fn test_complete() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::MessageDelta("Final ".to_owned()),
                PresetEvent::MessageDelta("Answer: ".to_owned()),
                PresetEvent::MessageDelta("hi".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let on_delta_called = Arc::new(AtomicBool::new(false));
            let completion = model_client
                .complete(ModelRequest::with_prompt("Hi"), Duration::from_secs(1), {
                    let on_delta_called = Arc::clone(&on_delta_called);
                    move |_| {
                        on_delta_called.store(true, Ordering::Relaxed);
                    }
                })
                .await
                .unwrap();
            assert_eq!(completion.text, "Final Answer: hi");
            assert_eq!(completion.finish_reason, Some(ModelFinishReason::Stop));
            assert!(on_delta_called.load(Ordering::Relaxed));
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .complete(ModelRequest::with_prompt("Hi"), Duration::from_secs(1), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Provider {
                kind: ErrorKind::RateLimitExceeded,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mut model_provider = TestModelProvider::default();
        model_provider.set_delay(Duration::from_secs(10));
        model_provider.add_text_response("Final Answer: late");
        let model_client = ModelClient::new(model_provider);

        let err = model_client
            .complete(ModelRequest::with_prompt("Hi"), Duration::from_secs(2), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_secs(2)));
        assert_eq!(err.to_string(), "no response within 2s");
    }
}
