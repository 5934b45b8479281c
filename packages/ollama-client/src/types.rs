//! Ollama API request and response types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Chat Completion
// =============================================================================

/// Chat completion request for `/api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to use (e.g., "llama3.1:8b")
    pub model: String,

    /// Conversation messages
    pub messages: Vec<Message>,

    /// Constrain the output format (JSON mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ResponseFormat>,

    /// Sampling options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,

    /// Whether the server should stream NDJSON chunks
    pub stream: bool,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b".to_string(),
            messages: Vec::new(),
            format: None,
            options: None,
            stream: false,
        }
    }
}

impl ChatRequest {
    /// Create a new chat request with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add a message to the conversation.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(ModelOptions::default).temperature = Some(temperature);
        self
    }

    /// Ask the model to answer with a single JSON object.
    pub fn json(mut self) -> Self {
        self.format = Some(ResponseFormat::Json);
        self
    }
}

/// Output format constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Json,
}

/// Model sampling options.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelOptions {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Context window size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Response content
    pub content: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Token counts reported by Ollama.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_eval_count: u32,

    /// Tokens generated
    pub eval_count: u32,
}

/// Raw chat response from the API (also the shape of each streamed line).
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    #[serde(default)]
    pub message: Option<ChatMessageRaw>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponseRaw {
    pub(crate) fn usage(&self) -> Option<Usage> {
        match (self.prompt_eval_count, self.eval_count) {
            (Some(prompt_eval_count), Some(eval_count)) => Some(Usage {
                prompt_eval_count,
                eval_count,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageRaw {
    #[serde(default)]
    pub content: String,
}

// =============================================================================
// Embeddings
// =============================================================================

/// Batched embedding request for `/api/embed`.
#[derive(Debug, Serialize)]
pub(crate) struct EmbedRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serializes_json_mode() {
        let request = ChatRequest::new("llama3.1:8b")
            .message(Message::user("hi"))
            .temperature(0.1)
            .json();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!(value["options"].get("num_ctx").is_none());
    }

    #[test]
    fn test_plain_request_omits_format() {
        let value = serde_json::to_value(ChatRequest::new("m")).unwrap();
        assert!(value.get("format").is_none());
        assert!(value.get("options").is_none());
    }
}
