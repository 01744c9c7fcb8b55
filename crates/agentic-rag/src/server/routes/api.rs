//! JSON API handlers sharing the cookie session with the page

use axum::{
    extract::{Multipart, State},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde_json::json;

use super::{answer_question, save_upload};
use crate::error::Result;
use crate::server::session::SessionId;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse, FileType};

/// GET /api/info
pub async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let coordinator = state.coordinator();
    let config = state.config();

    Json(json!({
        "name": "agentic-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document question answering with ingestion, retrieval and LLM agents",
        "providers": {
            "embedding": coordinator.retrieval().embedder().name(),
            "embedding_model": config.gemini.embedding_model,
            "llm": coordinator.llm().llm().name(),
            "llm_model": coordinator.llm().llm().model(),
        },
        "chunking": {
            "chunk_size": coordinator.ingestion().splitter().chunk_size(),
            "chunk_overlap": coordinator.ingestion().splitter().chunk_overlap(),
        },
        "supported_types": FileType::EXTENSIONS,
        "indexed_chunks": coordinator.retrieval().len(),
        "active_sessions": state.session_count(),
        "endpoints": {
            "POST /api/upload": "Upload a document (multipart field 'file')",
            "POST /api/ask": "Ask a question about the uploaded document",
            "GET /api/history": "Questions and answers of this session",
            "POST /api/reset": "Forget the uploaded document and history"
        }
    }))
}

/// POST /api/upload
pub async fn upload(
    State(state): State<AppState>,
    session: SessionId,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let path = save_upload(&state, session.0, multipart).await?;
    let file_type = FileType::from_path(&path);

    Ok((
        AppendHeaders(session.cookie_headers(&state)),
        Json(json!({
            "message": "Document uploaded and ready!",
            "path": path,
            "file_type": file_type,
        })),
    ))
}

/// POST /api/ask
pub async fn ask(
    State(state): State<AppState>,
    session: SessionId,
    Json(request): Json<AskRequest>,
) -> Result<impl IntoResponse> {
    let (turn, processing_time_ms) = answer_question(&state, session.0, &request.query).await?;

    Ok((
        AppendHeaders(session.cookie_headers(&state)),
        Json(AskResponse {
            question: turn.question,
            answer: turn.answer,
            sources: turn.sources,
            processing_time_ms,
        }),
    ))
}

/// GET /api/history - newest first
pub async fn history(State(state): State<AppState>, session: SessionId) -> impl IntoResponse {
    let mut turns = state.session(session.0).history;
    turns.reverse();
    (AppendHeaders(session.cookie_headers(&state)), Json(turns))
}

/// POST /api/reset
pub async fn reset(State(state): State<AppState>, session: SessionId) -> impl IntoResponse {
    state.reset_session(session.0);
    (
        AppendHeaders(session.cookie_headers(&state)),
        Json(json!({ "status": "reset" })),
    )
}
