//! Cookie-keyed chat sessions

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::convert::Infallible;
use std::path::PathBuf;
use uuid::Uuid;

use super::state::AppState;
use crate::types::ChatTurn;

/// Name of the cookie holding the session id
pub const SESSION_COOKIE: &str = "rag_session";

/// Severity of a one-shot status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Status message shown once on the next page render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Per-browser state: the uploaded document and the questions asked about it
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub file_path: Option<PathBuf>,
    pub history: Vec<ChatTurn>,
    pub flash: Option<Flash>,
    /// Last request that read or wrote this session
    pub last_seen: DateTime<Utc>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self {
            file_path: None,
            history: Vec::new(),
            flash: None,
            last_seen: Utc::now(),
        }
    }
}

impl ChatSession {
    /// Whether the session has been idle for longer than `ttl`
    pub fn is_idle(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_seen > ttl
    }
}

/// Session id from the `rag_session` cookie, if present and well formed
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(id: Uuid) -> HeaderValue {
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    // A hyphenated UUID and fixed attributes are always valid header text
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Extracts the caller's session id
///
/// A missing or unknown cookie yields a fresh id. Nothing is stored for it
/// until a handler first writes to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// `Set-Cookie` header keeping the browser on this session, once it is stored
    pub fn cookie_headers(&self, state: &AppState) -> Vec<(header::HeaderName, HeaderValue)> {
        if state.has_session(self.0) {
            vec![(header::SET_COOKIE, session_cookie(self.0))]
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = match session_id_from_headers(&parts.headers) {
            Some(id) if state.has_session(id) => id,
            _ => Uuid::new_v4(),
        };
        Ok(SessionId(id))
    }
}
