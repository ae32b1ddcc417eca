//! OpenAI-compatible chat completion types.

use serde::{Deserialize, Serialize};

/// OpenAI-compatible chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response.
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub stream_options: Option<StreamOptions>,
}

impl ChatCompletionRequest {
    /// Streaming request that asks the engine to report usage in the last chunk.
    pub fn streaming(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: Some(true),
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    pub fn include_usage(&self) -> bool {
        self.stream_options
            .as_ref()
            .map(|o| o.include_usage)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    #[serde(default)]
    pub include_usage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// One incremental unit of a streaming chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Creates a chunk with no choices and no usage.
    ///
    /// All chunks of one completion share `id` and `created`, so callers pass
    /// them in rather than generating fresh ones per chunk.
    pub fn empty(id: &str, created: i64, model: &str) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: Vec::new(),
            usage: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.choices.push(ChunkChoice {
            index: 0,
            delta: ChunkDelta {
                role: Some("assistant".to_string()),
                content: Some(content.into()),
            },
            finish_reason: None,
        });
        self
    }

    /// Marks the first choice as finished, adding an empty one if needed.
    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        if self.choices.is_empty() {
            self.choices.push(ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: None,
            });
        }
        self.choices[0].finish_reason = Some(reason.into());
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Content delta of the first choice, if it carries any text.
    pub fn content_delta(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Resource consumption reported by the engine for one completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<UsageExtra>,
}

/// Timing figures reported alongside token counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageExtra {
    #[serde(default)]
    pub e2e_latency_s: f64,
    #[serde(default)]
    pub prefill_tokens_per_s: f64,
    #[serde(default)]
    pub decode_tokens_per_s: f64,
    #[serde(default)]
    pub time_to_first_token_s: f64,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: UsageExtra) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Creates a completion id in the `chatcmpl-<uuid>` form.
pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4())
}

/// Current unix timestamp, as used in the `created` field.
pub fn created_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completion_request_defaults() {
        let json = r#"{"messages": [{"role": "user", "content": "Hello"}]}"#;
        let req: ChatCompletionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.messages.len(), 1);
        assert!(req.model.is_none());
        assert!(req.temperature.is_none());
        assert!(req.top_p.is_none());
        assert!(req.stream_options.is_none());
        assert!(!req.include_usage());
    }

    #[test]
    fn test_streaming_request_includes_usage() {
        let req = ChatCompletionRequest::streaming(vec![ChatMessage::user("hi")]);
        assert_eq!(req.stream, Some(true));
        assert!(req.include_usage());

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["stream_options"]["include_usage"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_chat_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        let msg = ChatMessage::assistant("a");
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "a");
    }

    #[test]
    fn test_chunk_content_delta() {
        let chunk = ChatCompletionChunk::empty("chatcmpl-1", 0, "m").with_content("He");
        assert_eq!(chunk.object, "chat.completion.chunk");
        assert_eq!(chunk.content_delta(), Some("He"));
    }

    #[test]
    fn test_chunk_without_choices_has_no_delta() {
        let chunk = ChatCompletionChunk::empty("chatcmpl-1", 0, "m").with_usage(Usage::new(3, 2));
        assert!(chunk.content_delta().is_none());
        assert_eq!(chunk.usage.unwrap().total_tokens, 5);
    }

    #[test]
    fn test_empty_delta_is_not_content() {
        let chunk = ChatCompletionChunk::empty("chatcmpl-1", 0, "m").with_content("");
        assert!(chunk.content_delta().is_none());
    }

    #[test]
    fn test_finish_reason_on_empty_chunk() {
        let chunk = ChatCompletionChunk::empty("chatcmpl-1", 0, "m").with_finish_reason("stop");
        assert_eq!(chunk.choices.len(), 1);
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(chunk.content_delta().is_none());
    }

    #[test]
    fn test_chunk_deserializes_openai_shape() {
        let json = r#"{
            "id": "chatcmpl-abc",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "Llama-3.2-1B",
            "choices": [{"index": 0, "delta": {"content": "llo"}, "finish_reason": null}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5,
                      "extra": {"decode_tokens_per_s": 40.5}}
        }"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.content_delta(), Some("llo"));
        let usage = chunk.usage.unwrap();
        assert_eq!(usage.total_tokens, 5);
        let extra = usage.extra.unwrap();
        assert_eq!(extra.decode_tokens_per_s, 40.5);
        assert_eq!(extra.e2e_latency_s, 0.0);
    }

    #[test]
    fn test_usage_total_tokens_calculation() {
        let usage = Usage::new(100, 50);
        assert_eq!(
            usage.total_tokens,
            usage.prompt_tokens + usage.completion_tokens
        );
        assert!(usage.extra.is_none());
    }

    #[test]
    fn test_usage_total_tokens_saturates() {
        let usage = Usage::new(u32::MAX, 1);
        assert_eq!(usage.total_tokens, u32::MAX);
        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.completion_tokens, 1);
    }

    #[test]
    fn test_completion_id_prefix() {
        let id = completion_id();
        assert!(id.starts_with("chatcmpl-"));
        assert_ne!(id, completion_id());
    }
}
