//! Offline rebuild of the materials collection.
//!
//! The flow is: describe each record → split descriptions into overlapping
//! chunks → embed in memory-bounded windows → upsert one window at a time.
//! The collection is dropped and recreated on every run; there is no
//! incremental update.

pub mod batch;
pub mod chunk;
pub mod material;

pub use batch::{stream_embeddings_in_batch, EmbeddingWindow};
pub use chunk::split_text;
pub use material::{parse_summaries, MaterialSummary};

use futures::StreamExt;
use serde::Serialize;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::traits::{
    embedder::Embedder,
    store::{CollectionParams, Point, VectorStore},
};
use crate::types::config::IngestConfig;

/// Result of a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records described.
    pub materials: usize,
    /// Chunks produced from the descriptions.
    pub chunks: usize,
    /// Points written to the store.
    pub points: usize,
}

/// A chunk of one record's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionChunk {
    pub material_id: String,
    pub text: String,
}

/// Describe and chunk every record, keeping record order.
pub fn chunk_summaries(summaries: &[MaterialSummary], config: &IngestConfig) -> Result<Vec<DescriptionChunk>> {
    let mut chunks = Vec::new();
    for summary in summaries {
        for text in split_text(&summary.describe(), config.chunk_size, config.chunk_overlap)? {
            chunks.push(DescriptionChunk {
                material_id: summary.material_id.clone(),
                text,
            });
        }
    }
    Ok(chunks)
}

fn validate(config: &IngestConfig) -> Result<()> {
    if config.vector_size == 0 {
        return Err(RagError::invalid_input("vector size must be positive"));
    }
    if config.embed_batch_size == 0 || config.window_size % config.embed_batch_size != 0 || config.window_size == 0 {
        return Err(RagError::invalid_input(format!(
            "window size ({}) must be a positive multiple of batch size ({})",
            config.window_size, config.embed_batch_size
        )));
    }
    Ok(())
}

/// Drop and rebuild the collection from `summaries`.
///
/// Configuration and chunking are checked before anything is deleted, so an
/// invalid run leaves the existing collection untouched.
pub async fn rebuild_collection<E, V>(
    embedder: &E,
    store: &V,
    summaries: &[MaterialSummary],
    config: &IngestConfig,
) -> Result<IngestReport>
where
    E: Embedder + ?Sized,
    V: VectorStore + ?Sized,
{
    validate(config)?;
    let chunks = chunk_summaries(summaries, config)?;
    let started = Instant::now();

    info!(
        collection = %config.collection,
        materials = summaries.len(),
        chunks = chunks.len(),
        "Rebuilding collection"
    );

    if store.collection_exists(&config.collection).await? {
        store.delete_collection(&config.collection).await?;
    }
    store
        .create_collection(&config.collection, &CollectionParams::cosine(config.vector_size))
        .await?;

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut windows = Box::pin(stream_embeddings_in_batch(
        embedder,
        &texts,
        config.embed_batch_size,
        config.window_size,
    )?);

    let mut written = 0;
    while let Some(window) = windows.next().await {
        let window = window?;
        let points: Vec<Point> = chunks[window.start..window.end]
            .iter()
            .zip(window.vectors)
            .map(|(chunk, vector)| {
                Point::for_chunk(Uuid::new_v4().to_string(), vector, &chunk.material_id, &chunk.text)
            })
            .collect();

        let count = points.len();
        store.upsert(&config.collection, points).await?;
        written += count;
        info!(
            collection = %config.collection,
            inserted = count,
            total = written,
            "Points inserted"
        );
    }

    info!(
        collection = %config.collection,
        points = written,
        duration_ms = started.elapsed().as_millis(),
        "Collection rebuilt"
    );

    Ok(IngestReport {
        materials: summaries.len(),
        chunks: chunks.len(),
        points: written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::store::MockVectorStore;
    use crate::testing::MockEmbedder;

    #[tokio::test]
    async fn test_invalid_config_never_touches_store() {
        let mut store = MockVectorStore::new();
        store.expect_collection_exists().never();
        store.expect_delete_collection().never();

        let config = IngestConfig::new().with_chunking(100, 100);
        let summaries = vec![MaterialSummary {
            material_id: "mp-1".into(),
            ..Default::default()
        }];

        let err = rebuild_collection(&MockEmbedder::new(4), &store, &summaries, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_existing_collection_is_dropped_first() {
        let mut store = MockVectorStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_collection_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        store
            .expect_delete_collection()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store
            .expect_create_collection()
            .withf(|name, params| name == "materials" && params.vector_size == 4)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        store
            .expect_upsert()
            .withf(|_, points| points.len() == 1 && points[0].payload["material_id"] == "mp-7")
            .times(1)
            .returning(|_, _| Ok(()));

        let config = IngestConfig::new().with_vector_size(4);
        let summaries = vec![MaterialSummary {
            material_id: "mp-7".into(),
            ..Default::default()
        }];

        let report = rebuild_collection(&MockEmbedder::new(4), &store, &summaries, &config)
            .await
            .unwrap();
        assert_eq!(
            report,
            IngestReport {
                materials: 1,
                chunks: 1,
                points: 1
            }
        );
    }
}
