//! Vector store trait and the point types it moves.
//!
//! The store holds one collection per knowledge base. Each point carries an
//! embedding plus a JSON payload with the record identifier and the chunk
//! text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Payload key holding the record identifier.
pub const MATERIAL_ID_KEY: &str = "material_id";

/// Payload key holding the chunk text.
pub const PAGE_CONTENT_KEY: &str = "page_content";

/// JSON payload stored alongside a vector.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Distance metric for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

/// Parameters for creating a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionParams {
    pub vector_size: usize,
    pub distance: Distance,
}

impl CollectionParams {
    pub fn cosine(vector_size: usize) -> Self {
        Self {
            vector_size,
            distance: Distance::Cosine,
        }
    }
}

/// A vector with its payload, ready to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl Point {
    /// Build a point for one chunk of a material description.
    pub fn for_chunk(id: impl Into<String>, vector: Vec<f32>, material_id: &str, text: &str) -> Self {
        let mut payload = Payload::new();
        payload.insert(MATERIAL_ID_KEY.into(), material_id.into());
        payload.insert(PAGE_CONTENT_KEY.into(), text.into());
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

impl ScoredPoint {
    /// The chunk text, if the payload carries one.
    pub fn page_content(&self) -> Option<&str> {
        self.payload.get(PAGE_CONTENT_KEY).and_then(|v| v.as_str())
    }
}

/// Payload filter for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadFilter {
    /// Payload `key` equals any of `values`.
    AnyOf { key: String, values: Vec<String> },
}

impl PayloadFilter {
    /// Filter on the record identifier.
    pub fn material_ids(ids: &[String]) -> Self {
        PayloadFilter::AnyOf {
            key: MATERIAL_ID_KEY.to_string(),
            values: ids.to_vec(),
        }
    }

    /// Check a payload against this filter.
    pub fn matches(&self, payload: &Payload) -> bool {
        match self {
            PayloadFilter::AnyOf { key, values } => payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(|v| values.iter().any(|want| want == v))
                .unwrap_or(false),
        }
    }
}

/// A similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub filter: Option<PayloadFilter>,
}

/// Vector database holding the indexed descriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether `collection` exists.
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Create an empty collection.
    async fn create_collection(&self, collection: &str, params: &CollectionParams) -> Result<()>;

    /// Drop a collection and all its points.
    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Insert or replace points.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// Nearest points to the query vector, best first.
    async fn query(&self, collection: &str, query: &VectorQuery) -> Result<Vec<ScoredPoint>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_filter_matches_any_identifier() {
        let point = Point::for_chunk("p1", vec![1.0], "mp-149", "Material ID: mp-149");
        let filter = PayloadFilter::material_ids(&["mp-1".into(), "mp-149".into()]);
        assert!(filter.matches(&point.payload));

        let other = PayloadFilter::material_ids(&["mp-2".into()]);
        assert!(!other.matches(&point.payload));
    }
}
