use react_agent_model::ModelRequest;
use serde::{Deserialize, Serialize};

use crate::OpenAIConfig;

// The chat endpoint rejects more stop sequences than this.
const MAX_STOP_SEQUENCES: usize = 4;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

/// Error body, sent either as the whole response or as a stream event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ApiError {
    pub message: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User { content: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

// -----------
// Conversions
// -----------

pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    if req.stop.len() > MAX_STOP_SEQUENCES {
        warn!(
            "only the first {MAX_STOP_SEQUENCES} of {} stop sequences are sent",
            req.stop.len()
        );
    }
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![Message::User {
            content: req.prompt.clone(),
        }],
        stop: req.stop.iter().take(MAX_STOP_SEQUENCES).cloned().collect(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        stream: true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest::with_prompt("Question: hi\nThought:")
            .with_stop("\nObservation:");
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let body = serde_json::to_value(create_request(&request, &config))
            .unwrap();
        assert_eq!(
            body,
            json!({
                "model": "custom",
                "messages": [
                    {"role": "user", "content": "Question: hi\nThought:"}
                ],
                "stop": ["\nObservation:"],
                "temperature": 0.0,
                "stream": true,
            })
        );
    }

    #[test]
    fn test_stop_sequences_are_capped() {
        let mut request = ModelRequest::with_prompt("hi");
        for i in 0..6 {
            request = request.with_stop(format!("stop{i}"));
        }
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_max_tokens(16)
            .build();
        let body = create_request(&request, &config);
        assert_eq!(body.stop.len(), MAX_STOP_SEQUENCES);
        assert_eq!(body.max_tokens, Some(16));
    }

    #[test]
    fn test_parse_chunk() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"c1","choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content, None);

        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"id":"c1","choices":[],"usage":{}}"#)
                .unwrap();
        assert!(chunk.choices.is_empty());
    }
}
