//! Retriever trait over the materials knowledge base.

use async_trait::async_trait;

use crate::error::Result;

/// Search the indexed material descriptions.
///
/// Both operations return the raw text of the matching chunks. An empty
/// result is not an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top-`k` chunks by similarity to `query`, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>>;

    /// Chunks whose record identifier is any of `ids`, at most `limit`.
    ///
    /// Returns an empty list for empty `ids` without touching the store.
    async fn search_by_ids(&self, ids: &[String], limit: usize) -> Result<Vec<String>>;
}
