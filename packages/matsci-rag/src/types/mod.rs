//! Domain types for the materials RAG library.

pub mod attributes;
pub mod config;
