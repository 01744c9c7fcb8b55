//! LLM response agent: `RETRIEVAL_RESULT` envelope in, answer out

use std::sync::Arc;

use super::prompt::PromptBuilder;
use crate::error::Result;
use crate::mcp::{agents, LlmResponse, McpMessage, MessageType, RetrievalResult};
use crate::providers::LlmProvider;

/// Renders the prompt and calls the chat model
pub struct LlmResponseAgent {
    llm: Arc<dyn LlmProvider>,
}

impl LlmResponseAgent {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Answer the query of a retrieval envelope from its top chunks
    pub async fn generate_answer(&self, msg: &McpMessage<RetrievalResult>) -> Result<String> {
        let context = PromptBuilder::build_context(&msg.payload.top_chunks);
        let prompt = PromptBuilder::build_prompt(&msg.payload.query, &context);

        tracing::debug!(
            trace_id = %msg.trace_id,
            model = self.llm.model(),
            "Sending prompt of {} chars",
            prompt.chars().count()
        );

        self.llm.generate(&prompt).await
    }

    /// Like [`generate_answer`](Self::generate_answer), wrapped in an envelope
    /// addressed to the coordinator
    pub async fn respond(&self, msg: &McpMessage<RetrievalResult>) -> Result<McpMessage<LlmResponse>> {
        let answer = self.generate_answer(msg).await?;

        Ok(McpMessage::new(
            agents::LLM_RESPONSE,
            agents::COORDINATOR,
            MessageType::LlmResponse,
            LlmResponse {
                answer,
                sources: msg.payload.top_chunks.clone(),
            },
            Some(msg.trace_id.clone()),
        ))
    }
}
