//! Error types shared by the gateway and the memory proxy

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::StatusResponse;

/// Result type alias for chat backend operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// JSON request body whose rejection is handled by the handler instead of axum.
pub type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

#[derive(Error, Debug)]
pub enum ChatError {

    // =============================
    // Core Taxonomy
    // =============================

    /// Network failure talking to an external service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// A required request field was missing or empty.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external service answered with an error status or unusable output.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChatError {
    /// Short machine-readable label used in JSON error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Transport(_) | ChatError::HttpError(_) | ChatError::IoError(_) => {
                "transport"
            }
            ChatError::Store(_) | ChatError::DatabaseError(_) => "store",
            ChatError::Validation(_) => "validation",
            ChatError::Upstream(_) | ChatError::SerializationError(_) => "upstream",
            ChatError::Config(_) => "config",
        }
    }

    /// Transport failures may succeed on a later attempt; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Transport(_) | ChatError::IoError(_) => true,
            ChatError::HttpError(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Message without the variant prefix, as carried in JSON payloads.
    pub fn detail(&self) -> String {
        match self {
            ChatError::Transport(m)
            | ChatError::Store(m)
            | ChatError::Validation(m)
            | ChatError::Upstream(m)
            | ChatError::Config(m) => m.clone(),
            other => other.to_string(),
        }
    }

    /// Rebuild an error reported by a peer service as `{kind, message}`.
    pub fn from_payload(kind: Option<&str>, message: String) -> Self {
        match kind {
            Some("store") => ChatError::Store(message),
            Some("validation") => ChatError::Validation(message),
            Some("transport") => ChatError::Transport(message),
            Some("config") => ChatError::Config(message),
            _ => ChatError::Upstream(message),
        }
    }

    /// Helper for missing request fields.
    pub fn missing_field(field: &str) -> Self {
        ChatError::Validation(format!("missing required field '{}'", field))
    }
}

/// Unreadable or mistyped JSON bodies surface as validation failures.
impl From<JsonRejection> for ChatError {
    fn from(rejection: JsonRejection) -> Self {
        ChatError::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(kind = self.kind(), "Request failed: {}", self);
        } else {
            warn!(kind = self.kind(), "Request rejected: {}", self);
        }

        (status, Json(StatusResponse::error(&self))).into_response()
    }
}
