//! Model implementations for the materials RAG library.
//!
//! This module provides reference implementations of the `Gateway` and
//! `Embedder` traits. Users can use these directly or implement their own.

#[cfg(feature = "ollama")]
mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbedder, OllamaGateway, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL};
