//! Materials-Science Question Answering Library
//!
//! Retrieval-augmented question answering over a knowledge base of
//! Materials Project summary records.
//!
//! # Design
//!
//! - Explicit stage graph, not a framework: each stage returns a partial
//!   state update and the pipeline dispatches on the stage name
//! - Collaborators are injected: a [`Gateway`] for model calls and a
//!   [`Retriever`] for the knowledge base
//! - Fail toward clarification: when nothing relevant is known the model is
//!   asked to request a material ID instead of answering
//! - Progress is a side channel that never steers the run
//!
//! # Usage
//!
//! ```rust,ignore
//! use matsci_rag::{Pipeline, VectorRetriever, QdrantStore};
//! use matsci_rag::ai::{OllamaEmbedder, OllamaGateway};
//! use ollama_client::OllamaClient;
//!
//! let client = OllamaClient::from_env()?;
//! let retriever = VectorRetriever::new(
//!     OllamaEmbedder::new(client.clone()),
//!     QdrantStore::new("http://localhost:6333"),
//! );
//! let pipeline = Pipeline::new(OllamaGateway::new(client), retriever);
//!
//! let answer = pipeline.ask("What is the band gap of mp-149?", vec![]).await?;
//! println!("{}", answer.output);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (Gateway, Retriever, VectorStore, Embedder)
//! - [`types`] - Attribute taxonomy and configuration
//! - [`pipeline`] - Query pipeline stages and prompts
//! - [`ingest`] - Offline collection rebuild
//! - [`stores`] - Vector store implementations (MemoryVectorStore, QdrantStore)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod ids;
pub mod ingest;
pub mod pipeline;
pub mod reporter;
pub mod retriever;
pub mod sink;
pub mod state;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "ollama")]
pub mod ai;

// Re-export core types at crate root
pub use error::{RagError, Result};
pub use ids::{extract_ids, source_link};
pub use ingest::{rebuild_collection, IngestReport, MaterialSummary};
pub use pipeline::{Answer, Pipeline, PipelineRun, RunContext, Stage};
pub use reporter::{NoopReporter, ProgressReporter, ThoughtTrace, TraceReporter, TraceState};
pub use retriever::VectorRetriever;
pub use sink::{ChannelSink, NullSink, OutputSink};
pub use state::{ChatMessage, ConversationState, Role, StateUpdate};
pub use stores::{MemoryVectorStore, QdrantStore};
pub use traits::{
    embedder::Embedder,
    gateway::{Gateway, TextStream},
    retriever::Retriever,
    store::{
        CollectionParams, Distance, Payload, PayloadFilter, Point, ScoredPoint, VectorQuery,
        VectorStore,
    },
};
pub use types::{
    attributes::AttributeCategory,
    config::{IngestConfig, PipelineConfig},
};
