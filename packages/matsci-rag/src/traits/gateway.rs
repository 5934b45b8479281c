//! Gateway trait for language-model calls.
//!
//! The gateway is the only place the pipeline talks to a model. It offers
//! three call styles:
//! - Plain text completion
//! - JSON-mode completion returning a parsed object
//! - Streaming text completion yielding fragments in order

use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::pin::Pin;

use crate::error::{RagError, Result};

/// Stream of response fragments. Concatenated in order they form the full
/// response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Language-model gateway.
///
/// Implementations wrap a specific provider and translate its failures into
/// [`RagError::Gateway`](crate::error::RagError::Gateway). A JSON response
/// that cannot be parsed is reported as
/// [`RagError::JsonParse`](crate::error::RagError::JsonParse) so callers can
/// tell a confused model from an unreachable one.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Complete `prompt` and return the whole text.
    async fn complete_text(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// Complete `prompt` in JSON mode and return the parsed object.
    async fn complete_json(&self, prompt: &str, temperature: f32) -> Result<serde_json::Value>;

    /// Complete `prompt` as a stream of fragments.
    async fn stream_text(&self, prompt: &str, temperature: f32) -> Result<TextStream> {
        // Default implementation yields the whole completion as one fragment
        let text = self.complete_text(prompt, temperature).await?;
        Ok(Box::pin(stream::once(async move { Ok::<_, RagError>(text) })))
    }
}
