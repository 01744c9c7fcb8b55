use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::Chunk;

/// Envelope type tag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Chunks produced by the ingestion agent
    ParsedDocuments,
    /// Top chunks produced by the retrieval agent
    RetrievalResult,
    /// Answer produced by the LLM response agent
    LlmResponse,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParsedDocuments => "PARSED_DOCUMENTS",
            Self::RetrievalResult => "RETRIEVAL_RESULT",
            Self::LlmResponse => "LLM_RESPONSE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message exchanged between agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpMessage<P> {
    pub sender: String,
    pub receiver: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub trace_id: String,
    pub payload: P,
}

/// Fresh trace id for one question
pub fn new_trace_id() -> String {
    Uuid::new_v4().to_string()
}

impl<P> McpMessage<P> {
    /// Create an envelope. A missing or empty trace id is replaced by a fresh UUID.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        message_type: MessageType,
        payload: P,
        trace_id: Option<String>,
    ) -> Self {
        let trace_id = trace_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_trace_id);

        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            message_type,
            trace_id,
            payload,
        }
    }
}

impl<P: Serialize> McpMessage<P> {
    /// Dictionary form: `sender`, `receiver`, `type`, `trace_id`, `payload`
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "sender": self.sender,
                "receiver": self.receiver,
                "type": self.message_type.as_str(),
                "trace_id": self.trace_id,
                "payload": format!("<unserializable: {}>", e),
            })
        })
    }
}

impl<P: Serialize> fmt::Display for McpMessage<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Payload of a `PARSED_DOCUMENTS` message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedDocuments {
    pub documents: Vec<Chunk>,
}

/// Payload of a `RETRIEVAL_RESULT` message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub top_chunks: Vec<Chunk>,
    pub query: String,
}

/// Payload of an `LLM_RESPONSE` message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub answer: String,
    pub sources: Vec<Chunk>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::agents;

    fn message(trace_id: Option<String>) -> McpMessage<RetrievalResult> {
        McpMessage::new(
            agents::RETRIEVAL,
            agents::LLM_RESPONSE,
            MessageType::RetrievalResult,
            RetrievalResult {
                top_chunks: Vec::new(),
                query: "what is rust?".to_string(),
            },
            trace_id,
        )
    }

    #[test]
    fn test_trace_id_is_generated_when_missing() {
        let generated = message(None);
        assert!(Uuid::parse_str(&generated.trace_id).is_ok());

        let from_empty = message(Some(String::new()));
        assert!(Uuid::parse_str(&from_empty.trace_id).is_ok());
        assert_ne!(generated.trace_id, from_empty.trace_id);
    }

    #[test]
    fn test_trace_id_is_kept() {
        let msg = message(Some("trace-42".to_string()));
        assert_eq!(msg.trace_id, "trace-42");
    }

    #[test]
    fn test_to_value_shape() {
        let value = message(Some("t1".to_string())).to_value();

        assert_eq!(value["sender"], "RetrievalAgent");
        assert_eq!(value["receiver"], "LLMResponseAgent");
        assert_eq!(value["type"], "RETRIEVAL_RESULT");
        assert_eq!(value["trace_id"], "t1");
        assert_eq!(value["payload"]["query"], "what is rust?");
        assert!(value["payload"]["top_chunks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_display_matches_value() {
        let msg = message(Some("t2".to_string()));
        assert_eq!(msg.to_string(), msg.to_value().to_string());
    }
}
