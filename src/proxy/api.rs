//! REST API for the memory store proxy
//!
//! Thin JSON layer over `MemoryService`. Every failure is caught here and
//! reported as `{"status": "error", ...}`; nothing crashes the process.

use axum::{extract::State, routing::post, Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ChatError, JsonBody};
use crate::models::{
    require, AddMemoryRequest, AddMessageRequest, Message, PersonaRequest, ResultResponse,
    SessionKey, SessionRequest, StatusResponse, DEFAULT_MEMORY_LIMIT, DEFAULT_MESSAGE_LIMIT,
};
use crate::proxy::MemoryService;
use crate::Result;

#[derive(Clone)]
pub struct ProxyState {
    pub service: MemoryService,
}

async fn add_message(
    State(state): State<ProxyState>,
    body: JsonBody<AddMessageRequest>,
) -> Result<Json<StatusResponse>> {
    let Json(req) = body?;
    let key = SessionKey::from_parts(req.persona.as_deref(), req.session_id.as_deref())?;
    let speaker = require("speaker", req.speaker.as_deref())?;
    let text = req.text.as_deref().ok_or_else(|| ChatError::missing_field("text"))?;

    state.service.append_message(&key, speaker, text).await?;
    Ok(Json(StatusResponse::success()))
}

async fn get_messages(
    State(state): State<ProxyState>,
    body: JsonBody<SessionRequest>,
) -> Result<Json<ResultResponse<Vec<Message>>>> {
    let Json(req) = body?;
    let key = SessionKey::from_parts(req.persona.as_deref(), req.session_id.as_deref())?;
    let limit = req.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);

    let messages = state.service.list_messages(&key, limit).await?;
    Ok(Json(ResultResponse::new(messages)))
}

async fn get_sessions(
    State(state): State<ProxyState>,
    body: JsonBody<PersonaRequest>,
) -> Result<Json<ResultResponse<Vec<String>>>> {
    let Json(req) = body?;
    let persona = require("persona", req.persona.as_deref())?;
    let sessions = state.service.list_sessions(persona).await?;
    Ok(Json(ResultResponse::new(sessions)))
}

async fn clear_history(
    State(state): State<ProxyState>,
    body: JsonBody<SessionRequest>,
) -> Result<Json<StatusResponse>> {
    let Json(req) = body?;
    let key = SessionKey::from_parts(req.persona.as_deref(), req.session_id.as_deref())?;
    state.service.clear_history(&key).await?;
    Ok(Json(StatusResponse::success()))
}

async fn add_persona_memory(
    State(state): State<ProxyState>,
    body: JsonBody<AddMemoryRequest>,
) -> Result<Json<StatusResponse>> {
    let Json(req) = body?;
    let persona = require("persona", req.persona.as_deref())?;
    let text = req.text.as_deref().ok_or_else(|| ChatError::missing_field("text"))?;

    state.service.append_persona_memory(persona, text).await?;
    Ok(Json(StatusResponse::success()))
}

async fn get_persona_memory(
    State(state): State<ProxyState>,
    body: JsonBody<PersonaRequest>,
) -> Result<Json<ResultResponse<String>>> {
    let Json(req) = body?;
    // The persona is accepted for symmetry; the log is shared.
    let persona = req.persona.as_deref().unwrap_or_default();
    let limit = req.limit.unwrap_or(DEFAULT_MEMORY_LIMIT);

    let transcript = state.service.persona_memory(persona, limit).await?;
    Ok(Json(ResultResponse::new(transcript)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(service: MemoryService) -> Router {
    let state = ProxyState { service };

    Router::new()
        .route("/health", axum::routing::get(crate::health))
        .route("/mcp/add_message", post(add_message))
        .route("/mcp/get_messages", post(get_messages))
        .route("/mcp/get_sessions", post(get_sessions))
        .route("/mcp/clear_history", post(clear_history))
        .route("/mcp/add_persona_memory", post(add_persona_memory))
        .route("/mcp/get_persona_memory", post(get_persona_memory))
        .fallback(crate::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    service: MemoryService,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("Memory proxy listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
