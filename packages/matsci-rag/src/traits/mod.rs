//! Core trait abstractions for the materials RAG library.
//!
//! These traits define the seams the query pipeline and the ingestion job
//! are written against: a language-model gateway, a retriever, a vector
//! store and an embedder.

pub mod embedder;
pub mod gateway;
pub mod retriever;
pub mod store;
