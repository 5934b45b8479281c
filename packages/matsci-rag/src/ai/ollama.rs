//! Ollama implementations of the Gateway and Embedder traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use matsci_rag::ai::{OllamaEmbedder, OllamaGateway};
//! use ollama_client::OllamaClient;
//!
//! let client = OllamaClient::from_env()?;
//! let gateway = OllamaGateway::new(client.clone()).with_model("llama3.1:8b");
//! let embedder = OllamaEmbedder::new(client);
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use ollama_client::{ChatRequest, Message, OllamaClient, OllamaError};
use serde_json::Value;

use crate::error::{RagError, Result};
use crate::traits::{
    embedder::Embedder,
    gateway::{Gateway, TextStream},
};

/// Chat model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "llama3.1:8b";

/// Embedding model used when none is configured. Produces 768-dimensional
/// vectors.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

fn gateway_error(e: OllamaError) -> RagError {
    RagError::Gateway(Box::new(e))
}

/// Gateway backed by an Ollama chat model.
#[derive(Clone)]
pub struct OllamaGateway {
    client: OllamaClient,
    model: String,
}

impl OllamaGateway {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    /// Set the chat model (default: llama3.1:8b).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str, temperature: f32) -> ChatRequest {
        ChatRequest::new(&self.model)
            .message(Message::user(prompt))
            .temperature(temperature)
    }
}

#[async_trait]
impl Gateway for OllamaGateway {
    async fn complete_text(&self, prompt: &str, temperature: f32) -> Result<String> {
        let response = self
            .client
            .chat_completion(self.request(prompt, temperature))
            .await
            .map_err(gateway_error)?;
        Ok(response.content)
    }

    async fn complete_json(&self, prompt: &str, temperature: f32) -> Result<Value> {
        let response = self
            .client
            .chat_completion(self.request(prompt, temperature).json())
            .await
            .map_err(gateway_error)?;
        Ok(serde_json::from_str(response.content.trim())?)
    }

    async fn stream_text(&self, prompt: &str, temperature: f32) -> Result<TextStream> {
        let stream = self
            .client
            .chat_completion_stream(self.request(prompt, temperature))
            .await
            .map_err(gateway_error)?;

        Ok(Box::pin(stream.filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) if chunk.delta.is_empty() => None,
                Ok(chunk) => Some(Ok(chunk.delta)),
                Err(e) => Some(Err(gateway_error(e))),
            }
        })))
    }
}

/// Embedder backed by an Ollama embedding model.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBED_MODEL.to_string(),
        }
    }

    /// Set the embedding model (default: nomic-embed-text).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client
            .create_embeddings(&self.model, texts)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_prompt_and_temperature() {
        let gateway = OllamaGateway::new(OllamaClient::new("http://127.0.0.1:11434"));
        let request = gateway.request("band gap of mp-1?", 0.2);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "llama3.1:8b");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "band gap of mp-1?");
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_gateway_error() {
        let gateway = OllamaGateway::new(OllamaClient::new("http://127.0.0.1:9"));
        let err = gateway.complete_text("hello", 0.0).await.unwrap_err();
        assert!(matches!(err, RagError::Gateway(_)));
        assert!(err.is_upstream());
    }
}
