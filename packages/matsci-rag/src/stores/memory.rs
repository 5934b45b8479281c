//! In-memory vector store implementation.
//!
//! Useful for testing and small-scale deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{RagError, Result};
use crate::traits::store::{
    cosine_similarity, CollectionParams, Point, ScoredPoint, VectorQuery, VectorStore,
};

#[derive(Debug)]
struct Collection {
    params: CollectionParams,
    points: Vec<Point>,
}

/// In-memory vector store.
///
/// Points keep insertion order, so equal scores come back in the order they
/// were upserted.
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVectorStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of points in a collection, zero if it does not exist.
    pub fn point_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStore(format!("collection not found: {}", collection).into())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.collections.read().unwrap().contains_key(collection))
    }

    async fn create_collection(&self, collection: &str, params: &CollectionParams) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        if collections.contains_key(collection) {
            return Err(RagError::VectorStore(
                format!("collection already exists: {}", collection).into(),
            ));
        }
        collections.insert(
            collection.to_string(),
            Collection {
                params: params.clone(),
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.collections.write().unwrap().remove(collection);
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        for point in points {
            if point.vector.len() != target.params.vector_size {
                return Err(RagError::VectorStore(
                    format!(
                        "vector size {} does not match collection size {}",
                        point.vector.len(),
                        target.params.vector_size
                    )
                    .into(),
                ));
            }
            match target.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => target.points.push(point),
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &VectorQuery) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().unwrap();
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut scored: Vec<ScoredPoint> = target
            .points
            .iter()
            .filter(|p| {
                query
                    .filter
                    .as_ref()
                    .map(|f| f.matches(&p.payload))
                    .unwrap_or(true)
            })
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(&query.vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among ties
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.limit);

        Ok(scored)
    }
}
