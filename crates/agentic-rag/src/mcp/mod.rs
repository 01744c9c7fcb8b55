//! Message envelope passed between the agents
//!
//! The envelope is a data-transfer convention: it carries a sender, a
//! receiver, a type tag, a payload and a trace id. It does no validation,
//! retries or delivery tracking.

mod message;

pub use message::{
    new_trace_id, LlmResponse, McpMessage, MessageType, ParsedDocuments, RetrievalResult,
};

/// Agent names used as envelope senders and receivers
pub mod agents {
    pub const INGESTION: &str = "IngestionAgent";
    pub const RETRIEVAL: &str = "RetrievalAgent";
    pub const LLM_RESPONSE: &str = "LLMResponseAgent";
    pub const COORDINATOR: &str = "CoordinatorAgent";
}
