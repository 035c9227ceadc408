use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use react_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Answers every prompt with its own last line, cut at the first stop
/// sequence, one word per event.
#[derive(Debug)]
struct FakeModelResponse {
    fake_items: VecDeque<String>,
    finished: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeModelResponse {
    fn new(req: &ModelRequest) -> Self {
        let last_line = req.prompt.lines().last().unwrap_or_default();
        let mut completion = format!("Final Answer: {last_line}");
        for stop in &req.stop {
            if let Some(idx) = completion.find(stop.as_str()) {
                completion.truncate(idx);
            }
        }
        let fake_items = completion
            .split(' ')
            .map(ToString::to_string)
            .collect();
        Self {
            fake_items,
            finished: false,
            sleep: None,
        }
    }
}

impl ModelResponse for FakeModelResponse {
    type Error = FakeModelProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if let Some(mut this_item) = this.fake_items.pop_front() {
                if !this.fake_items.is_empty() {
                    this_item.push(' ');
                }
                return Poll::Ready(Ok(Some(
                    ModelResponseEvent::MessageDelta(this_item),
                )));
            }
            if !this.finished {
                this.finished = true;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            }

            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Response = FakeModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = if req.prompt.trim().is_empty() {
            Err(FakeModelProviderError(ErrorKind::Other))
        } else {
            Ok(FakeModelResponse::new(req))
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    async fn collect(mut resp: FakeModelResponse) -> (String, bool) {
        let mut text = String::new();
        let mut completed = false;
        loop {
            let resp_fut =
                poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx));
            match resp_fut.await {
                Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                    text.push_str(&delta);
                }
                Ok(Some(ModelResponseEvent::Completed(reason))) => {
                    assert_eq!(reason, ModelFinishReason::Stop);
                    completed = true;
                }
                Ok(None) => break,
                Err(err) => unreachable!("unexpected error: {err:?}"),
            }
        }
        (text, completed)
    }

    #[tokio::test]
    async fn test_completion() {
        let provider = FakeModelProvider;
        let req = ModelRequest::with_prompt("Question: Good morning");
        let resp = provider.send_request(&req).await.unwrap();

        let (text, completed) = collect(resp).await;
        assert_eq!(text, "Final Answer: Question: Good morning");
        assert!(completed);
    }

    #[tokio::test]
    async fn test_stop_sequence() {
        let provider = FakeModelProvider;
        let req = ModelRequest::with_prompt("Thought: hi\nObservation: 4")
            .with_stop("Observation:");
        let resp = provider.send_request(&req).await.unwrap();

        let (text, _) = collect(resp).await;
        assert_eq!(text, "Final Answer: ");
    }

    #[tokio::test]
    async fn test_error() {
        let provider = FakeModelProvider;
        let result = provider.send_request(&ModelRequest::default()).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
