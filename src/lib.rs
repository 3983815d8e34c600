//! Persona Chat
//!
//! A two-tier chat backend:
//! - a conversation gateway that talks to the generation and speech
//!   services and composes persona replies
//! - a memory store proxy over a document store holding chat turns per
//!   (persona, session) and one shared memory log
//!
//! FLOW:
//! CLIENT → GATEWAY → MEMORY PROXY → DOCUMENT STORE
//!          GATEWAY → GEMINI / SPEECH → CLIENT

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod personas;
pub mod proxy;
pub mod store;

use axum::{http::StatusCode, Json};

pub use error::{ChatError, Result};

// Re-export common types
pub use models::*;

/// `GET /health` on both services.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}
