//! HTML form handlers; every post redirects back to `/`

use axum::{
    extract::{Multipart, State},
    response::{AppendHeaders, Html, IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;

use super::{answer_question, save_upload};
use crate::error::Error;
use crate::server::page::render_page;
use crate::server::session::{Flash, SessionId};
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub query: String,
}

/// GET / - render the chat page, consuming any pending flash
pub async fn index(State(state): State<AppState>, session: SessionId) -> impl IntoResponse {
    let flash = state.take_flash(session.0);
    let page = render_page(&state.session(session.0), flash.as_ref());
    (AppendHeaders(session.cookie_headers(&state)), Html(page))
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    session: SessionId,
    multipart: Multipart,
) -> impl IntoResponse {
    let flash = match save_upload(&state, session.0, multipart).await {
        Ok(_) => Flash::success("Document uploaded and ready!"),
        Err(e) => {
            tracing::warn!("Upload failed: {}", e);
            Flash::error(format!("Error: {}", e))
        }
    };
    state.set_flash(session.0, flash);

    (AppendHeaders(session.cookie_headers(&state)), Redirect::to("/"))
}

/// POST /ask
pub async fn ask(
    State(state): State<AppState>,
    session: SessionId,
    Form(form): Form<AskForm>,
) -> impl IntoResponse {
    match answer_question(&state, session.0, &form.query).await {
        Ok(_) => {}
        Err(Error::Session(message)) => state.set_flash(session.0, Flash::warning(message)),
        Err(e) => state.set_flash(session.0, Flash::error(format!("Error: {}", e))),
    }

    (AppendHeaders(session.cookie_headers(&state)), Redirect::to("/"))
}

/// POST /reset
pub async fn reset(State(state): State<AppState>, session: SessionId) -> impl IntoResponse {
    state.reset_session(session.0);
    (AppendHeaders(session.cookie_headers(&state)), Redirect::to("/"))
}
