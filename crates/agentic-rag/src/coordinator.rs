//! Coordinator agent: runs ingestion, retrieval and generation for one question

use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

use crate::error::Result;
use crate::generation::LlmResponseAgent;
use crate::ingestion::IngestionAgent;
use crate::mcp::new_trace_id;
use crate::retrieval::RetrievalAgent;
use crate::types::Chunk;

/// Health of the hosted providers
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ProviderHealth {
    pub embedding: bool,
    pub llm: bool,
}

/// Owns the three worker agents and sequences them
pub struct CoordinatorAgent {
    ingestion: IngestionAgent,
    retrieval: Arc<RetrievalAgent>,
    llm: LlmResponseAgent,
}

impl CoordinatorAgent {
    pub fn new(ingestion: IngestionAgent, retrieval: Arc<RetrievalAgent>, llm: LlmResponseAgent) -> Self {
        Self {
            ingestion,
            retrieval,
            llm,
        }
    }

    pub fn ingestion(&self) -> &IngestionAgent {
        &self.ingestion
    }

    pub fn retrieval(&self) -> &Arc<RetrievalAgent> {
        &self.retrieval
    }

    pub fn llm(&self) -> &LlmResponseAgent {
        &self.llm
    }

    /// Answer `query` from the document at `path`, returning the answer and its source chunks
    pub async fn handle_file_and_query(&self, path: &Path, query: &str) -> Result<(String, Vec<Chunk>)> {
        let trace_id = new_trace_id();
        let span = tracing::info_span!("question", trace_id = %trace_id);

        async move {
            let doc_msg = self
                .ingestion
                .parse_and_split(path, Some(&trace_id))
                .await
                .map_err(|e| {
                    tracing::error!("Ingestion of {} failed: {}", path.display(), e);
                    e
                })?;
            tracing::info!(
                "Ingestion produced {} chunks from {}",
                doc_msg.payload.documents.len(),
                path.display()
            );

            let report = self.retrieval.add_documents(&doc_msg).await.map_err(|e| {
                tracing::error!("Adding documents to the index failed: {}", e);
                e
            })?;
            tracing::info!("Documents added to vector index ({} new)", report.embedded);

            let source = path.to_string_lossy();
            let retrieval_msg = self
                .retrieval
                .search_in(query, &trace_id, Some(source.as_ref()))
                .await
                .map_err(|e| {
                    tracing::error!("Retrieval failed: {}", e);
                    e
                })?;
            tracing::info!("Retrieved {} chunks", retrieval_msg.payload.top_chunks.len());

            let answer = self.llm.generate_answer(&retrieval_msg).await.map_err(|e| {
                tracing::error!("Answer generation failed: {}", e);
                e
            })?;

            let sources = retrieval_msg.payload.top_chunks;
            tracing::info!("Answer generated from {} sources", sources.len());
            if let Some(first) = sources.first() {
                tracing::debug!("First source: {}", first.preview(100));
            }

            Ok((answer, sources))
        }
        .instrument(span)
        .await
    }

    /// Probe both hosted providers
    pub async fn health_check(&self) -> ProviderHealth {
        let embedding = self
            .retrieval
            .embedder()
            .health_check()
            .await
            .unwrap_or(false);
        let llm = self.llm.llm().health_check().await.unwrap_or(false);
        ProviderHealth { embedding, llm }
    }
}
