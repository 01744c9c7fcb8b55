//! Routes for the chat page and the JSON API

pub mod api;
pub mod form;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    routing::{get, post},
    Router,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::DocumentLoader;
use crate::server::state::AppState;
use crate::types::ChatTurn;

/// Message for a question without a document or without text
pub const MISSING_INPUT: &str = "Please upload a document and enter a question.";

/// Routes served at the site root
pub fn page_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(form::index))
        .route(
            "/upload",
            post(form::upload).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(form::ask))
        .route("/reset", post(form::reset))
}

/// Routes nested under `/api`
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/info", get(api::info))
        .route(
            "/upload",
            post(api::upload).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(api::ask))
        .route("/history", get(api::history))
        .route("/reset", post(api::reset))
}

/// Save the multipart `file` field into the session's upload directory and
/// make it the session's current document
pub(crate) async fn save_upload(
    state: &AppState,
    session: Uuid,
    mut multipart: Multipart,
) -> Result<PathBuf> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Internal(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Session("Please choose a file to upload.".to_string()))?;

        let dir = state.upload_dir_for(session);
        let path = dir.join(&filename);
        DocumentLoader::detect(&path)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read file: {}", e)))?;

        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(&path, &data).await?;
        tracing::info!("Saved upload {} ({} bytes)", path.display(), data.len());

        state.update_session(session, |s| s.file_path = Some(path.clone()));
        return Ok(path);
    }

    Err(Error::Session("Please choose a file to upload.".to_string()))
}

/// Answer a question about the session's document and record it in the history
pub(crate) async fn answer_question(
    state: &AppState,
    session: Uuid,
    query: &str,
) -> Result<(ChatTurn, u64)> {
    let file_path = state.session(session).file_path;
    let path = match file_path {
        Some(path) if !query.trim().is_empty() => path,
        _ => return Err(Error::Session(MISSING_INPUT.to_string())),
    };

    let start = Instant::now();
    let (answer, sources) = state
        .coordinator()
        .handle_file_and_query(&path, query)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let turn = ChatTurn::new(query.to_string(), answer, sources);
    state.update_session(session, |s| s.history.push(turn.clone()));

    Ok((turn, elapsed))
}
