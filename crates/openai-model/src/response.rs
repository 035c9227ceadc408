use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use react_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, ErrorResponse};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Set when a chunk carried both content and a finish reason. The
    // reason is emitted right after the content.
    pending_finish_reason: Option<ModelFinishReason>,
    finished: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            pending_finish_reason: None,
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));

        Poll::Ready(Ok(Some(event)))
    }
}

fn finish_reason(reason: &str) -> Result<ModelFinishReason, Error> {
    match reason {
        "length" => Ok(ModelFinishReason::Length),
        "content_filter" => Err(Error::new(
            "completion was blocked by the content filter",
            ErrorKind::Moderated,
        )),
        _ => Ok(ModelFinishReason::Stop),
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        partial_state.finished = true;
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(err.to_string(), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            if partial_state.finished {
                break;
            }
            // Some servers end with the sentinel alone.
            partial_state.finished = true;
            return Ok((
                Some(ModelResponseEvent::Completed(ModelFinishReason::Stop)),
                partial_state,
            ));
        }

        let mut chunk = match serde_json::from_str::<ChatCompletionChunk>(
            &sse_event,
        ) {
            Ok(chunk) => chunk,
            Err(err) => {
                // Some servers report failures mid-stream as an error body.
                if let Ok(resp) =
                    serde_json::from_str::<ErrorResponse>(&sse_event)
                {
                    return Err(Error::new(resp.error.message, ErrorKind::Other));
                }
                return Err(Error::new(format!("{err}"), ErrorKind::Other));
            }
        };
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        };

        // Usage reports arrive without choices.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };
        if partial_state.finished {
            continue;
        }

        let reason = choice.finish_reason.as_deref().map(finish_reason);
        let reason = reason.transpose()?;
        let content = choice.delta.content.filter(|c| !c.is_empty());

        match (content, reason) {
            (Some(content), reason) => {
                partial_state.pending_finish_reason = reason;
                return Ok((
                    Some(ModelResponseEvent::MessageDelta(content)),
                    partial_state,
                ));
            }
            (None, Some(reason)) => {
                partial_state.finished = true;
                return Ok((
                    Some(ModelResponseEvent::Completed(reason)),
                    partial_state,
                ));
            }
            (None, None) => continue,
        }
    }

    if !partial_state.finished {
        return Err(Error::new(
            "stream ended before completion",
            ErrorKind::Other,
        ));
    }
    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use react_agent_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: Chunks,
    ) -> Result<(String, Vec<ModelFinishReason>), Error> {
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut text = String::new();
        let mut reasons = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => {
                    text.push_str(&delta)
                }
                ModelResponseEvent::Completed(reason) => reasons.push(reason),
            }
        }
        Ok((text, reasons))
    }

    #[tokio::test]
    async fn test_fixture() {
        let chunks = Chunks::from_static(&[include_bytes!(
            "../fixtures/test_response.txt"
        )]);
        let (text, reasons) = collect(chunks).await.unwrap();
        assert_eq!(
            text,
            "Thought: I should compute it.\nAction: calculator\nAction Input: 2+2"
        );
        assert_eq!(reasons, [ModelFinishReason::Stop]);
    }

    #[tokio::test]
    async fn test_content_with_finish_reason() {
        let chunks = Chunks::from_static(&[
            br#"data: {"id":"a","choices":[{"delta":{"content":"Final Answer: 4"},"finish_reason":"length"}]}"#,
            b"\n\ndata: [DONE]\n\n",
        ]);
        let (text, reasons) = collect(chunks).await.unwrap();
        assert_eq!(text, "Final Answer: 4");
        assert_eq!(reasons, [ModelFinishReason::Length]);
    }

    #[tokio::test]
    async fn test_content_filter() {
        let chunks = Chunks::from_static(&[
            br#"data: {"id":"a","choices":[{"delta":{},"finish_reason":"content_filter"}]}"#,
            b"\n\n",
        ]);
        let err = collect(chunks).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_error_event() {
        let chunks = Chunks::from_static(&[
            br#"data: {"error":{"message":"overloaded"}}"#,
            b"\n\n",
        ]);
        let err = collect(chunks).await.unwrap_err();
        assert_eq!(err.message(), "overloaded");
    }

    #[tokio::test]
    async fn test_truncated_stream() {
        let chunks = Chunks::from_static(&[
            br#"data: {"id":"a","choices":[{"delta":{"content":"Thought:"}}]}"#,
            b"\n\n",
        ]);
        let err = collect(chunks).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "stream ended before completion");
    }

    #[tokio::test]
    async fn test_done_without_finish_reason() {
        let chunks = Chunks::from_static(&[
            br#"data: {"id":"a","choices":[{"delta":{"content":"Final Answer: 4"}}]}"#,
            b"\n\ndata: [DONE]\n\n",
        ]);
        let (text, reasons) = collect(chunks).await.unwrap();
        assert_eq!(text, "Final Answer: 4");
        assert_eq!(reasons, [ModelFinishReason::Stop]);
    }
}
