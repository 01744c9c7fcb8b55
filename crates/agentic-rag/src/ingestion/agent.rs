//! Ingestion agent: file path in, `PARSED_DOCUMENTS` envelope out

use std::path::Path;

use super::loader::DocumentLoader;
use super::splitter::TextSplitter;
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::mcp::{agents, McpMessage, MessageType, ParsedDocuments};

/// Loads a document and splits it into chunks
pub struct IngestionAgent {
    splitter: TextSplitter,
}

impl IngestionAgent {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
        }
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Parse the file at `path` and split it into chunks addressed to the retrieval agent
    pub async fn parse_and_split(
        &self,
        path: &Path,
        trace_id: Option<&str>,
    ) -> Result<McpMessage<ParsedDocuments>> {
        // Reject unknown extensions before touching the filesystem
        DocumentLoader::detect(path)?;

        let data = tokio::fs::read(path).await?;
        let path_buf = path.to_path_buf();
        let splitter = self.splitter.clone();

        let chunks = tokio::task::spawn_blocking(move || {
            let docs = DocumentLoader::load(&path_buf, &data)?;
            Ok::<_, crate::error::Error>(splitter.split_documents(&docs))
        })
        .await??;

        tracing::info!("Split {} into {} chunks", path.display(), chunks.len());

        Ok(McpMessage::new(
            agents::INGESTION,
            agents::RETRIEVAL,
            MessageType::ParsedDocuments,
            ParsedDocuments { documents: chunks },
            trace_id.map(str::to_string),
        ))
    }
}
