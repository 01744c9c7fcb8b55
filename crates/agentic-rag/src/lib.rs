//! agentic-rag: document question answering with cooperating agents
//!
//! An ingestion agent parses and splits an uploaded file, a retrieval agent
//! embeds the chunks and searches them, and an LLM response agent answers
//! from the top chunks. A coordinator runs the three in sequence and the
//! agents hand results to each other in [`mcp::McpMessage`] envelopes.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod mcp;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use coordinator::CoordinatorAgent;
pub use error::{Error, Result};
pub use mcp::{McpMessage, MessageType};
pub use types::{Chunk, ChatTurn, FileType};
