//! Provider abstractions for embeddings and answer generation
//!
//! The agents hold trait objects so the hosted Gemini API can be swapped
//! for another backend, or for an in-process fake in tests.

pub mod embedding;
pub mod gemini;
pub mod llm;

#[cfg(test)]
pub(crate) mod testing;

pub use embedding::EmbeddingProvider;
pub use gemini::{GeminiChat, GeminiClient, GeminiEmbedder};
pub use llm::LlmProvider;
