//! Configuration types for the query pipeline and the ingestion job.

use serde::{Deserialize, Serialize};

/// Default page prefix for record source links.
pub const MATERIALS_PROJECT_BASE_URL: &str = "https://next-gen.materialsproject.org/materials";

/// Default name of the vector collection.
pub const MATERIALS_COLLECTION: &str = "materials";

/// Configuration for the query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Temperature for rephrasing the question against the history.
    pub summarize_temperature: f32,

    /// Temperature for the attribute relevance classifier.
    pub attributes_temperature: f32,

    /// Temperature for rewriting the search query.
    pub search_query_temperature: f32,

    /// Temperature for judging how many records are needed.
    pub results_limit_temperature: f32,

    /// Temperature for the final answer.
    pub final_response_temperature: f32,

    /// Upper bound for the similarity top-k. The lower bound is always 1.
    pub max_data_points: usize,

    /// Top-k for identifier-scoped retrieval.
    ///
    /// Large descriptions are split into several chunks, so this must be big
    /// enough to return every chunk of the requested records. Default: 10.
    pub id_scoped_limit: usize,

    /// Prefix for record source links in the thought trace.
    pub source_base_url: String,

    /// Skip the summarize call and use the raw question as the summary.
    ///
    /// Workaround for models that answer instead of rephrasing. Default: false.
    pub passthrough_summary: bool,

    /// Skip the search-query rewrite and search with the summary.
    ///
    /// Default: false.
    pub passthrough_search_query: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            summarize_temperature: 0.3,
            attributes_temperature: 0.1,
            search_query_temperature: 0.3,
            results_limit_temperature: 0.0,
            final_response_temperature: 0.2,
            max_data_points: 10,
            id_scoped_limit: 10,
            source_base_url: MATERIALS_PROJECT_BASE_URL.to_string(),
            passthrough_summary: false,
            passthrough_search_query: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the summarize passthrough.
    pub fn with_passthrough_summary(mut self, enabled: bool) -> Self {
        self.passthrough_summary = enabled;
        self
    }

    /// Enable or disable the search-query passthrough.
    pub fn with_passthrough_search_query(mut self, enabled: bool) -> Self {
        self.passthrough_search_query = enabled;
        self
    }

    /// Set the identifier-scoped top-k.
    pub fn with_id_scoped_limit(mut self, limit: usize) -> Self {
        self.id_scoped_limit = limit.max(1);
        self
    }

    /// Set the source link prefix.
    pub fn with_source_base_url(mut self, url: impl Into<String>) -> Self {
        self.source_base_url = url.into();
        self
    }
}

/// Configuration for rebuilding the vector collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Collection to drop and recreate.
    pub collection: String,

    /// Dimensionality of the embedding model.
    pub vector_size: usize,

    /// Maximum characters per description chunk.
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,

    /// Texts per embedding request.
    pub embed_batch_size: usize,

    /// Vectors held in memory before upserting. Must be a multiple of
    /// `embed_batch_size`.
    pub window_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            collection: MATERIALS_COLLECTION.to_string(),
            vector_size: 768,
            chunk_size: 2000,
            chunk_overlap: 200,
            embed_batch_size: 16,
            window_size: 1600,
        }
    }
}

impl IngestConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the vector dimensionality.
    pub fn with_vector_size(mut self, size: usize) -> Self {
        self.vector_size = size;
        self
    }

    /// Set chunk size and overlap.
    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = overlap;
        self
    }

    /// Set embedding batch and window sizes.
    pub fn with_batching(mut self, batch_size: usize, window_size: usize) -> Self {
        self.embed_batch_size = batch_size;
        self.window_size = window_size;
        self
    }
}
