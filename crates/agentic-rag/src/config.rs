//! Configuration for the RAG chatbot

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable overriding the bind host
pub const HOST_ENV: &str = "AGENTIC_RAG_HOST";
/// Environment variable overriding the bind port
pub const PORT_ENV: &str = "AGENTIC_RAG_PORT";
/// Environment variable naming a TOML config file for the server binary
pub const CONFIG_ENV: &str = "AGENTIC_RAG_CONFIG";

/// Main chatbot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Gemini API configuration
    pub gemini: GeminiConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply `GOOGLE_API_KEY`, `AGENTIC_RAG_HOST` and `AGENTIC_RAG_PORT`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.gemini.api_key = Some(key);
            }
        }
        if let Ok(host) = std::env::var(HOST_ENV) {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port: {}", PORT_ENV, port)))?;
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.server.session_ttl_secs == 0 {
            return Err(Error::Config("session_ttl_secs must be greater than zero".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("top_k must be greater than zero".to_string()));
        }
        if self.retrieval.embed_concurrency == 0 {
            return Err(Error::Config("embed_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Directory uploaded documents are written to
    pub upload_dir: PathBuf,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Chat sessions idle for longer than this are dropped (default: 24h)
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            upload_dir: PathBuf::from("documents"),
            max_upload_size: 100 * 1024 * 1024, // 100MB
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Gemini (Google Generative Language API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; `GOOGLE_API_KEY` takes precedence
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Embedding dimensions produced by the embedding model
    pub embedding_dimensions: usize,
    /// Generation model name
    pub generation_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl GeminiConfig {
    /// API key, or a configuration error naming the variable to set
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} is not set", API_KEY_ENV)))
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            embedding_dimensions: 768,
            generation_model: "gemini-2.5-pro".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Vector retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Directory the vector index is persisted to
    pub persist_dir: PathBuf,
    /// Number of chunks returned per search
    pub top_k: usize,
    /// Remove any index left in `persist_dir` when the agent starts
    pub reset_on_start: bool,
    /// Chunks embedded concurrently during ingestion (1 = sequential)
    pub embed_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("./vector_index"),
            top_k: 3,
            reset_on_start: true,
            embed_concurrency: 1,
        }
    }
}
