//! Retriever over an embedder and a vector store.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::traits::{
    embedder::Embedder,
    retriever::Retriever,
    store::{PayloadFilter, ScoredPoint, VectorQuery, VectorStore},
};
use crate::types::config::MATERIALS_COLLECTION;

/// Retriever that embeds the query and searches one collection.
///
/// Results keep the order the store returns them in; no re-ranking is
/// applied. The store is only ever read.
pub struct VectorRetriever<E: Embedder, V: VectorStore> {
    embedder: E,
    store: V,
    collection: String,
}

impl<E: Embedder, V: VectorStore> VectorRetriever<E, V> {
    /// Create a retriever over the default `materials` collection.
    pub fn new(embedder: E, store: V) -> Self {
        Self {
            embedder,
            store,
            collection: MATERIALS_COLLECTION.to_string(),
        }
    }

    /// Search a different collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &V {
        &self.store
    }

    async fn run(&self, text: &str, limit: usize, filter: Option<PayloadFilter>) -> Result<Vec<String>> {
        let vector = self.embedder.embed_query(text).await?;
        let hits = self
            .store
            .query(
                &self.collection,
                &VectorQuery {
                    vector,
                    limit,
                    filter,
                },
            )
            .await?;

        debug!(collection = %self.collection, hits = hits.len(), "Vector query complete");
        Ok(page_contents(hits))
    }
}

fn page_contents(hits: Vec<ScoredPoint>) -> Vec<String> {
    hits.iter()
        .filter_map(|h| h.page_content().map(str::to_string))
        .collect()
}

#[async_trait]
impl<E: Embedder, V: VectorStore> Retriever for VectorRetriever<E, V> {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        self.run(query, k, None).await
    }

    async fn search_by_ids(&self, ids: &[String], limit: usize) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // The filter does the selecting; the empty query only satisfies the API
        self.run("", limit, Some(PayloadFilter::material_ids(ids)))
            .await
    }
}
