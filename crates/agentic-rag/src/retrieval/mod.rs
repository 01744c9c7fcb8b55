//! Vector retrieval
//!
//! Chunks are embedded through an [`EmbeddingProvider`](crate::providers::EmbeddingProvider)
//! and held in a brute-force cosine index persisted as JSON.

mod agent;
mod index;

pub use agent::{AddReport, RetrievalAgent};
pub use index::{cosine_similarity, IndexEntry, SearchResult, VectorIndex, INDEX_FILE};
