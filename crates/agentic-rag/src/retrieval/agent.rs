//! Retrieval agent: embeds chunks into the vector index and answers
//! similarity searches with `RETRIEVAL_RESULT` envelopes

use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::index::VectorIndex;
use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::mcp::{agents, McpMessage, MessageType, ParsedDocuments, RetrievalResult};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

/// Counts from one `add_documents` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Chunks in the incoming envelope
    pub received: usize,
    /// Chunks embedded and stored
    pub embedded: usize,
    /// Chunks whose embedding or insertion failed
    pub failed: usize,
    /// Chunks already present in the index
    pub skipped_duplicates: usize,
    /// Stored chunks dropped because their source no longer contains them
    pub removed_stale: usize,
}

/// Owns the vector index and the embedding provider
pub struct RetrievalAgent {
    embedder: Arc<dyn EmbeddingProvider>,
    persist_dir: PathBuf,
    top_k: usize,
    embed_concurrency: usize,
    /// `None` until the first add or load
    index: RwLock<Option<VectorIndex>>,
}

impl RetrievalAgent {
    /// Create the agent, removing a leftover index when `reset_on_start` is set
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: &RetrievalConfig) -> Result<Self> {
        if config.reset_on_start && config.persist_dir.exists() {
            tracing::warn!(
                "Removing existing vector index at {}",
                config.persist_dir.display()
            );
            std::fs::remove_dir_all(&config.persist_dir)?;
        }

        Ok(Self {
            embedder,
            persist_dir: config.persist_dir.clone(),
            top_k: config.top_k,
            embed_concurrency: config.embed_concurrency.max(1),
            index: RwLock::new(None),
        })
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Number of indexed chunks, zero before the first add
    pub fn len(&self) -> usize {
        self.index.read().as_ref().map_or(0, VectorIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed and store the chunks of a `PARSED_DOCUMENTS` envelope, then persist the index
    ///
    /// The envelope is the current content of each source it names: stored
    /// chunks of those sources that are no longer present are dropped.
    pub async fn add_documents(&self, msg: &McpMessage<ParsedDocuments>) -> Result<AddReport> {
        self.load_persisted().await?;

        let mut report = AddReport {
            received: msg.payload.documents.len(),
            ..AddReport::default()
        };

        let mut current: HashMap<&str, HashSet<String>> = HashMap::new();
        for chunk in &msg.payload.documents {
            current
                .entry(chunk.metadata.source.as_str())
                .or_default()
                .insert(chunk.content_hash());
        }

        let pending: Vec<Chunk> = {
            let guard = self.index.read();
            msg.payload
                .documents
                .iter()
                .filter(|chunk| {
                    let known = guard
                        .as_ref()
                        .is_some_and(|index| index.contains_hash(&chunk.content_hash()));
                    if known {
                        report.skipped_duplicates += 1;
                    }
                    !known
                })
                .cloned()
                .collect()
        };

        let embedded: Vec<(Chunk, Result<Vec<f32>>)> = stream::iter(pending)
            .map(|chunk| {
                let embedder = Arc::clone(&self.embedder);
                async move {
                    let result = embedder.embed(&chunk.content).await;
                    (chunk, result)
                }
            })
            .buffered(self.embed_concurrency)
            .collect()
            .await;

        let bytes = {
            let mut guard = self.index.write();
            let index = guard.get_or_insert_with(VectorIndex::new);

            for (source, keep) in &current {
                let removed = index.retain_source(source, keep);
                if removed > 0 {
                    tracing::info!(
                        trace_id = %msg.trace_id,
                        "Dropped {} outdated chunks of {}",
                        removed,
                        source
                    );
                }
                report.removed_stale += removed;
            }

            for (chunk, result) in embedded {
                let outcome = result.and_then(|vector| index.insert(chunk.clone(), vector));
                match outcome {
                    Ok(true) => report.embedded += 1,
                    Ok(false) => report.skipped_duplicates += 1,
                    Err(e) => {
                        tracing::warn!(
                            trace_id = %msg.trace_id,
                            "Skipping chunk {} of {}: {}",
                            chunk.chunk_index,
                            chunk.metadata.source,
                            e
                        );
                        report.failed += 1;
                    }
                }
            }

            index.to_bytes()?
        };

        if let Err(e) = VectorIndex::write_bytes(&self.persist_dir, bytes).await {
            tracing::error!(
                "Failed to persist vector index to {}: {}",
                self.persist_dir.display(),
                e
            );
            return Err(e);
        }

        tracing::info!(
            trace_id = %msg.trace_id,
            "Indexed {} of {} chunks ({} failed, {} already indexed, {} outdated removed)",
            report.embedded,
            report.received,
            report.failed,
            report.skipped_duplicates,
            report.removed_stale
        );

        Ok(report)
    }

    /// Drop every stored chunk of `source`, persisting the index when anything was removed
    pub async fn forget_source(&self, source: &str) -> Result<usize> {
        self.load_persisted().await?;

        let (removed, bytes) = {
            let mut guard = self.index.write();
            match guard.as_mut() {
                Some(index) => {
                    let removed = index.retain_source(source, &HashSet::new());
                    let bytes = if removed > 0 { Some(index.to_bytes()?) } else { None };
                    (removed, bytes)
                }
                None => (0, None),
            }
        };

        if let Some(bytes) = bytes {
            VectorIndex::write_bytes(&self.persist_dir, bytes).await?;
            tracing::info!("Removed {} chunks of {} from the index", removed, source);
        }
        Ok(removed)
    }

    /// Top chunks for `query` across the whole index
    pub async fn search(&self, query: &str, trace_id: &str) -> Result<McpMessage<RetrievalResult>> {
        self.search_in(query, trace_id, None).await
    }

    /// Top chunks for `query`, restricted to chunks from `source` when given
    pub async fn search_in(
        &self,
        query: &str,
        trace_id: &str,
        source: Option<&str>,
    ) -> Result<McpMessage<RetrievalResult>> {
        self.load_persisted().await?;
        if self.index.read().is_none() {
            return Err(Error::VectorDb(format!(
                "No vector index found in {}; add documents first",
                self.persist_dir.display()
            )));
        }

        let query_vector = self.embedder.embed_query(query).await?;

        let results = {
            let guard = self.index.read();
            match guard.as_ref() {
                Some(index) => index.search(&query_vector, self.top_k, source)?,
                None => Vec::new(),
            }
        };

        let top_chunks: Vec<Chunk> = results
            .into_iter()
            .map(|r| {
                let mut chunk = r.chunk;
                chunk.score = Some(r.similarity);
                chunk
            })
            .collect();

        tracing::debug!(trace_id = %trace_id, "Retrieved {} chunks", top_chunks.len());

        Ok(McpMessage::new(
            agents::RETRIEVAL,
            agents::LLM_RESPONSE,
            MessageType::RetrievalResult,
            RetrievalResult {
                top_chunks,
                query: query.to_string(),
            },
            Some(trace_id.to_string()),
        ))
    }

    /// Populate the in-memory index from disk if it has not been created yet
    async fn load_persisted(&self) -> Result<()> {
        if self.index.read().is_some() {
            return Ok(());
        }

        if let Some(loaded) = VectorIndex::load(&self.persist_dir).await? {
            let mut guard = self.index.write();
            if guard.is_none() {
                tracing::info!(
                    "Loaded {} chunks from {}",
                    loaded.len(),
                    self.persist_dir.display()
                );
                *guard = Some(loaded);
            }
        }
        Ok(())
    }
}
