//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the materials RAG
//! library without making real model or vector store calls.

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::error::{RagError, Result};
use crate::ids::extract_ids;
use crate::traits::{
    embedder::Embedder,
    gateway::{Gateway, TextStream},
    retriever::Retriever,
};

/// Canned response for one kind of prompt.
#[derive(Debug, Clone)]
enum Canned {
    Text(String),
    Json(Value),
    MalformedJson,
    Stream(Vec<String>),
}

/// Record of a call made to the mock gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum MockGatewayCall {
    Text { prompt: String, temperature: f32 },
    Json { prompt: String, temperature: f32 },
    Stream { prompt: String, temperature: f32 },
}

impl MockGatewayCall {
    pub fn prompt(&self) -> &str {
        match self {
            MockGatewayCall::Text { prompt, .. }
            | MockGatewayCall::Json { prompt, .. }
            | MockGatewayCall::Stream { prompt, .. } => prompt,
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            MockGatewayCall::Text { temperature, .. }
            | MockGatewayCall::Json { temperature, .. }
            | MockGatewayCall::Stream { temperature, .. } => *temperature,
        }
    }
}

/// A mock gateway for testing.
///
/// Responses are keyed by a substring of the prompt; the first registered
/// key found in the prompt wins. Prompts that match nothing get a generic
/// default response.
#[derive(Default)]
pub struct MockGateway {
    /// Predefined responses in registration order
    responses: Arc<RwLock<Vec<(String, Canned)>>>,

    /// Fail every call as if the server were down
    unavailable: bool,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockGatewayCall>>>,
}

impl MockGateway {
    /// Create a new mock gateway with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every call fails with a transport error.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    fn with(self, needle: impl Into<String>, canned: Canned) -> Self {
        self.responses.write().unwrap().push((needle.into(), canned));
        self
    }

    /// Answer prompts containing `needle` with `text`.
    pub fn with_text(self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.with(needle, Canned::Text(text.into()))
    }

    /// Answer JSON prompts containing `needle` with `value`.
    pub fn with_json(self, needle: impl Into<String>, value: Value) -> Self {
        self.with(needle, Canned::Json(value))
    }

    /// Fail JSON prompts containing `needle` with a parse error.
    pub fn with_malformed_json(self, needle: impl Into<String>) -> Self {
        self.with(needle, Canned::MalformedJson)
    }

    /// Stream `fragments` for prompts containing `needle`.
    pub fn with_stream<I, S>(self, needle: impl Into<String>, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(
            needle,
            Canned::Stream(fragments.into_iter().map(Into::into).collect()),
        )
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockGatewayCall> {
        self.calls.read().unwrap().clone()
    }

    /// Whether any prompt sent so far contains `needle`.
    pub fn was_prompted_with(&self, needle: &str) -> bool {
        self.calls().iter().any(|c| c.prompt().contains(needle))
    }

    fn lookup(&self, prompt: &str) -> Option<Canned> {
        self.responses
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, canned)| canned.clone())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(RagError::Gateway("mock gateway unavailable".into()));
        }
        Ok(())
    }

    fn record(&self, call: MockGatewayCall) {
        self.calls.write().unwrap().push(call);
    }
}

fn malformed() -> RagError {
    match serde_json::from_str::<Value>("{\"related_attributes\": [") {
        Err(e) => RagError::JsonParse(e),
        Ok(_) => RagError::invalid_input("expected malformed JSON"),
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn complete_text(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.record(MockGatewayCall::Text {
            prompt: prompt.to_string(),
            temperature,
        });
        self.check_available()?;

        Ok(match self.lookup(prompt) {
            Some(Canned::Text(text)) => text,
            Some(Canned::Stream(fragments)) => fragments.concat(),
            Some(Canned::Json(value)) => value.to_string(),
            _ => "mock response".to_string(),
        })
    }

    async fn complete_json(&self, prompt: &str, temperature: f32) -> Result<Value> {
        self.record(MockGatewayCall::Json {
            prompt: prompt.to_string(),
            temperature,
        });
        self.check_available()?;

        match self.lookup(prompt) {
            Some(Canned::Json(value)) => Ok(value),
            Some(Canned::MalformedJson) => Err(malformed()),
            Some(Canned::Text(text)) => Ok(serde_json::from_str(&text)?),
            _ => Ok(Value::Object(Default::default())),
        }
    }

    async fn stream_text(&self, prompt: &str, temperature: f32) -> Result<TextStream> {
        self.record(MockGatewayCall::Stream {
            prompt: prompt.to_string(),
            temperature,
        });
        self.check_available()?;

        let fragments = match self.lookup(prompt) {
            Some(Canned::Stream(fragments)) => fragments,
            Some(Canned::Text(text)) => vec![text],
            _ => vec!["mock ".to_string(), "response".to_string()],
        };
        Ok(Box::pin(stream::iter(fragments.into_iter().map(Ok::<String, RagError>))))
    }
}

/// Record of a call made to the mock retriever.
#[derive(Debug, Clone, PartialEq)]
pub enum MockRetrieverCall {
    Search { query: String, k: usize },
    SearchByIds { ids: Vec<String>, limit: usize },
}

/// A mock retriever over a fixed list of contexts.
///
/// `search` returns the first `k` contexts. `search_by_ids` returns the
/// contexts that mention any of the identifiers.
#[derive(Default)]
pub struct MockRetriever {
    contexts: Vec<String>,
    unavailable: bool,
    calls: Arc<RwLock<Vec<MockRetrieverCall>>>,
}

impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// A retriever whose every call fails as if the store were down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Add a context to the knowledge base.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.contexts.push(context.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockRetrieverCall> {
        self.calls.read().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(RagError::VectorStore("mock retriever unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        self.calls.write().unwrap().push(MockRetrieverCall::Search {
            query: query.to_string(),
            k,
        });
        self.check_available()?;
        Ok(self.contexts.iter().take(k).cloned().collect())
    }

    async fn search_by_ids(&self, ids: &[String], limit: usize) -> Result<Vec<String>> {
        self.calls.write().unwrap().push(MockRetrieverCall::SearchByIds {
            ids: ids.to_vec(),
            limit,
        });
        self.check_available()?;
        Ok(self
            .contexts
            .iter()
            .filter(|c| extract_ids(c).iter().any(|id| ids.contains(id)))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// A deterministic embedder for testing.
///
/// Equal texts always get equal vectors.
pub struct MockEmbedder {
    dim: usize,
    batch_sizes: Arc<RwLock<Vec<usize>>>,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            batch_sizes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Sizes of the batches embedded so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.read().unwrap().clone()
    }

    /// Generate a deterministic embedding based on text.
    fn generate_deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(text.as_bytes());

        // Use hash bytes to seed a deterministic embedding in [-1, 1]
        (0..self.dim)
            .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_sizes.write().unwrap().push(texts.len());
        Ok(texts
            .iter()
            .map(|t| self.generate_deterministic_embedding(t))
            .collect())
    }
}
