//! Typed errors for the materials RAG library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while answering a query or rebuilding the index.
#[derive(Debug, Error)]
pub enum RagError {
    /// Language model unreachable or failed
    #[error("language model error: {0}")]
    Gateway(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Vector store unreachable or rejected the request
    #[error("vector store error: {0}")]
    VectorStore(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The consumer went away mid-stream
    #[error("operation cancelled")]
    Cancelled,

    /// A conversation field was written twice in one run
    #[error("state field already set: {field}")]
    StateConflict { field: &'static str },

    /// Invalid input provided
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RagError {
    /// Whether this error means an upstream collaborator could not be reached.
    ///
    /// Upstream failures have no safe fallback and end the run.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RagError::Gateway(_) | RagError::VectorStore(_) | RagError::Embedding(_)
        )
    }

    /// Build an `InvalidInput` error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        RagError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, RagError>;
