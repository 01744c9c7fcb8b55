//! Chat server binary
//!
//! Run with: GOOGLE_API_KEY=... cargo run -p agentic-rag --bin agentic-rag-server

use agentic_rag::config::{RagConfig, CONFIG_ENV};
use agentic_rag::server::RagServer;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentic_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    if let Some(path) = &config_path {
        tracing::info!("  - Config file: {}", path.display());
    }
    tracing::info!("  - Embedding model: {}", config.gemini.embedding_model);
    tracing::info!("  - Generation model: {}", config.gemini.generation_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Upload directory: {}", config.server.upload_dir.display());
    tracing::info!("  - Vector index: {}", config.retrieval.persist_dir.display());

    let server = RagServer::new(config).await?;

    println!("\nAgentic RAG Chatbot with MCP");
    println!("  Chat:   http://{}/", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API:    http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
