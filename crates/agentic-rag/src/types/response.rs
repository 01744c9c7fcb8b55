//! Request and response types for the chat endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::Chunk;

/// One answered question in a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// The question as typed
    pub question: String,
    /// Generated answer
    pub answer: String,
    /// Chunks the answer was generated from
    pub sources: Vec<Chunk>,
    /// When the question was answered
    pub asked_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(question: String, answer: String, sources: Vec<Chunk>) -> Self {
        Self {
            question,
            answer,
            sources,
            asked_at: Utc::now(),
        }
    }
}

/// JSON body of `POST /api/ask`
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    /// The question
    pub query: String,
}

/// JSON response of `POST /api/ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// The question that was answered
    pub question: String,
    /// Generated answer
    pub answer: String,
    /// Chunks the answer was generated from
    pub sources: Vec<Chunk>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}
