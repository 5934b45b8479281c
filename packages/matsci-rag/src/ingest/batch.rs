//! Memory-bounded embedding of large text sets.

use async_stream::try_stream;
use futures::Stream;

use crate::error::{RagError, Result};
use crate::traits::embedder::Embedder;

/// A contiguous run of embeddings.
///
/// `vectors[i]` is the embedding of `texts[start + i]`; `end` is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingWindow {
    pub start: usize,
    pub end: usize,
    pub vectors: Vec<Vec<f32>>,
}

/// Embed `texts` in requests of `batch_size`, yielding a window every
/// `window_size` vectors and a final shorter window for the remainder.
///
/// At most one window plus one batch of vectors is held at a time.
/// `window_size` must be a positive multiple of `batch_size`.
pub fn stream_embeddings_in_batch<'a, E: Embedder + ?Sized>(
    embedder: &'a E,
    texts: &'a [String],
    batch_size: usize,
    window_size: usize,
) -> Result<impl Stream<Item = Result<EmbeddingWindow>> + Send + 'a> {
    if batch_size == 0 || window_size == 0 || window_size % batch_size != 0 {
        return Err(RagError::invalid_input(format!(
            "window size ({}) must be a positive multiple of batch size ({})",
            window_size, batch_size
        )));
    }

    Ok(try_stream! {
        let mut pending: Vec<Vec<f32>> = Vec::with_capacity(window_size);
        let mut start = 0;

        for batch in texts.chunks(batch_size) {
            let vectors = embedder.embed(batch).await?;
            if vectors.len() != batch.len() {
                Err::<(), _>(RagError::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )))?;
            }
            pending.extend(vectors);

            while pending.len() >= window_size {
                let rest = pending.split_off(window_size);
                let vectors = std::mem::replace(&mut pending, rest);
                let end = start + window_size;
                yield EmbeddingWindow { start, end, vectors };
                start = end;
            }
        }

        if !pending.is_empty() {
            let end = start + pending.len();
            yield EmbeddingWindow { start, end, vectors: pending };
        }
    })
}
