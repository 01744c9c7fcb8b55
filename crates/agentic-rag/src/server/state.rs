//! Application state for the chat server

use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::session::{ChatSession, Flash};
use crate::config::RagConfig;
use crate::coordinator::CoordinatorAgent;
use crate::error::Result;
use crate::generation::LlmResponseAgent;
use crate::ingestion::IngestionAgent;
use crate::providers::{gemini::gemini_providers, EmbeddingProvider, LlmProvider};
use crate::retrieval::RetrievalAgent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Agent pipeline shared by all sessions
    coordinator: CoordinatorAgent,
    /// Chat sessions keyed by cookie id
    sessions: DashMap<Uuid, ChatSession>,
}

impl AppState {
    /// Create state backed by the Gemini API
    pub async fn new(config: RagConfig) -> Result<Self> {
        let (embedder, llm) = gemini_providers(&config.gemini)?;
        tracing::info!(
            "Gemini providers initialized (embedding: {}, generation: {})",
            config.gemini.embedding_model,
            config.gemini.generation_model
        );
        Self::with_providers(config, embedder, llm).await
    }

    /// Create state with explicit providers
    pub async fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.server.upload_dir).await?;

        let ingestion = IngestionAgent::new(&config.chunking);
        let retrieval = Arc::new(RetrievalAgent::new(embedder, &config.retrieval)?);
        let generation = LlmResponseAgent::new(llm);
        let coordinator = CoordinatorAgent::new(ingestion, retrieval, generation);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                coordinator,
                sessions: DashMap::new(),
            }),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn coordinator(&self) -> &CoordinatorAgent {
        &self.inner.coordinator
    }

    pub fn has_session(&self, id: Uuid) -> bool {
        self.inner.sessions.contains_key(&id)
    }

    /// Directory holding this session's uploads
    pub fn upload_dir_for(&self, id: Uuid) -> PathBuf {
        self.inner.config.server.upload_dir.join(id.to_string())
    }

    /// Snapshot of a session, marking it as seen; unknown ids read as empty
    pub fn session(&self, id: Uuid) -> ChatSession {
        match self.inner.sessions.get_mut(&id) {
            Some(mut session) => {
                session.last_seen = Utc::now();
                session.clone()
            }
            None => ChatSession::default(),
        }
    }

    /// Mutate a session in place, storing it on first write
    pub fn update_session<R>(&self, id: Uuid, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        let mut entry = self.inner.sessions.entry(id).or_insert_with(|| {
            tracing::debug!("Created chat session {}", id);
            ChatSession::default()
        });
        entry.last_seen = Utc::now();
        f(entry.value_mut())
    }

    /// Clear uploaded file and history, keeping the session id
    pub fn reset_session(&self, id: Uuid) {
        if let Some(mut session) = self.inner.sessions.get_mut(&id) {
            *session = ChatSession::default();
        }
    }

    pub fn set_flash(&self, id: Uuid, flash: Flash) {
        self.update_session(id, |s| s.flash = Some(flash));
    }

    /// Remove and return the pending flash message
    pub fn take_flash(&self, id: Uuid) -> Option<Flash> {
        self.inner
            .sessions
            .get_mut(&id)
            .and_then(|mut session| session.flash.take())
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Drop sessions idle for longer than `session_ttl_secs`, along with
    /// their uploads and indexed chunks; returns how many were dropped
    pub async fn expire_idle_sessions(&self) -> usize {
        let secs = i64::try_from(self.inner.config.server.session_ttl_secs).unwrap_or(i64::MAX);
        let ttl = Duration::seconds(secs.min(i64::MAX / 1000));
        let now = Utc::now();

        let mut expired = Vec::new();
        self.inner.sessions.retain(|id, session| {
            if session.is_idle(now, ttl) {
                expired.push((*id, session.file_path.take()));
                false
            } else {
                true
            }
        });

        for (id, file_path) in &expired {
            if let Some(path) = file_path {
                let source = path.to_string_lossy();
                if let Err(e) = self.coordinator().retrieval().forget_source(&source).await {
                    tracing::warn!("Failed to drop indexed chunks of {}: {}", source, e);
                }
            }

            let dir = self.upload_dir_for(*id);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", dir.display(), e),
            }
        }

        if !expired.is_empty() {
            tracing::info!("Expired {} idle chat sessions", expired.len());
        }
        expired.len()
    }
}
