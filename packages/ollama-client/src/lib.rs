//! Pure Ollama REST API client
//!
//! A clean, minimal client for a local or remote Ollama server with no
//! domain-specific logic. Supports chat completions, JSON-mode completions,
//! NDJSON streaming, and batched embeddings.
//!
//! # Example
//!
//! ```rust,ignore
//! use ollama_client::{OllamaClient, ChatRequest, Message};
//!
//! let client = OllamaClient::from_env()?;
//!
//! // Chat completion
//! let response = client.chat_completion(
//!     ChatRequest::new("llama3.1:8b")
//!         .message(Message::user("Hello!"))
//!         .temperature(0.2),
//! ).await?;
//!
//! // Embeddings
//! let vectors = client.create_embeddings("nomic-embed-text", &["text".to_string()]).await?;
//! ```

pub mod error;
pub mod streaming;
pub mod types;

pub use error::{OllamaError, Result};
pub use streaming::{ChatCompletionChunk, ChatCompletionStream};
pub use types::*;

use reqwest::Client;
use tracing::{debug, warn};

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Pure Ollama API client.
#[derive(Clone)]
pub struct OllamaClient {
    http_client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from environment variable `OLLAMA_URL`, falling back to the local default.
    ///
    /// Accepts `host:port` as well as a full `http(s)://` URL.
    pub fn from_env() -> Result<Self> {
        match std::env::var("OLLAMA_URL") {
            Ok(url) => Self::parse_base_url(&url).map(Self::new),
            Err(_) => Ok(Self::new(DEFAULT_BASE_URL)),
        }
    }

    /// Normalize a user-supplied server address.
    pub fn parse_base_url(raw: &str) -> Result<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(OllamaError::Config("Ollama URL is empty".into()));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(raw.trim_end_matches('/').to_string());
        }
        if raw.contains("://") {
            return Err(OllamaError::Config(format!(
                "Ollama URL must use http or https: {}",
                raw
            )));
        }
        Ok(format!("http://{}", raw.trim_end_matches('/')))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Send messages to `/api/chat` and wait for the whole response.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();
        let request = ChatRequest {
            stream: false,
            ..request
        };

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Ollama request failed");
                OllamaError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Ollama API error");
            return Err(OllamaError::Api(format!("Ollama API error: {}", error_text)));
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))?;

        if let Some(error) = raw.error.clone() {
            return Err(OllamaError::Api(error));
        }

        let usage = raw.usage();
        let content = raw
            .message
            .map(|m| m.content)
            .ok_or_else(|| OllamaError::Api("No message in Ollama response".into()))?;

        debug!(
            model = %request.model,
            json_mode = request.format.is_some(),
            duration_ms = start.elapsed().as_millis(),
            "Ollama chat completion"
        );

        Ok(ChatResponse { content, usage })
    }

    /// Streaming chat completion.
    ///
    /// Send messages and get a stream of token chunks back. Ollama streams
    /// newline-delimited JSON objects.
    pub async fn chat_completion_stream(&self, request: ChatRequest) -> Result<ChatCompletionStream> {
        let request = ChatRequest {
            stream: true,
            ..request
        };

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Ollama streaming request failed");
                OllamaError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Ollama streaming API error");
            return Err(OllamaError::Api(format!(
                "Ollama streaming API error: {}",
                error_text
            )));
        }

        Ok(ChatCompletionStream::new(response.bytes_stream()))
    }

    /// Create embeddings for a batch of texts with one request.
    pub async fn create_embeddings(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = types::EmbedRequest {
            model,
            input: inputs,
        };

        let response = self
            .http_client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Embedding request failed");
                OllamaError::Network(e.to_string())
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(error = %error_text, "Ollama embedding error");
            return Err(OllamaError::Api(format!("Ollama embedding error: {}", error_text)));
        }

        let embed_response: types::EmbedResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))?;

        if embed_response.embeddings.len() != inputs.len() {
            return Err(OllamaError::Api(format!(
                "Ollama returned {} embeddings for {} inputs",
                embed_response.embeddings.len(),
                inputs.len()
            )));
        }

        Ok(embed_response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OllamaClient::new("http://gpu-box:11434/");
        assert_eq!(client.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            OllamaClient::parse_base_url("127.0.0.1:11434").unwrap(),
            "http://127.0.0.1:11434"
        );
        assert_eq!(
            OllamaClient::parse_base_url("https://ollama.internal/").unwrap(),
            "https://ollama.internal"
        );
        assert!(OllamaClient::parse_base_url("ftp://host").is_err());
        assert!(OllamaClient::parse_base_url("  ").is_err());
    }

    #[tokio::test]
    async fn test_empty_embedding_batch_skips_request() {
        // Unroutable address: any request would fail
        let client = OllamaClient::new("http://127.0.0.1:9");
        let vectors = client.create_embeddings("model", &[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
