//! Vector store implementations.
//!
//! - [`MemoryVectorStore`] keeps collections in process, for tests and demos
//! - [`QdrantStore`] talks to a Qdrant server over its REST API

pub mod memory;
pub mod qdrant;

pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;
