//! REST API for the conversation gateway
//!
//! Exposes chat, history, session and transcription endpoints plus the
//! static front-end files.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeFile, trace::TraceLayer};
use tracing::{error, info};

use crate::error::{ChatError, JsonBody};
use crate::gateway::ConversationService;
use crate::models::{
    require, Message, PersonaRequest, SendMessageRequest, SessionKey, SessionRequest,
    StatusResponse,
};
use crate::Result;

/// Multipart field carrying the recorded audio.
pub const AUDIO_FIELD: &str = "audio_file";

/// Upper bound for an uploaded recording.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub status: String,
    pub reply: String,
    pub reply_recorded: bool,
    pub memory_recorded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub status: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub status: String,
    pub sessions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub status: String,
    pub text: String,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct GatewayState {
    pub conversation: Arc<ConversationService>,
}

/// =============================
/// Chat Endpoints
/// =============================

async fn send_message(
    State(state): State<GatewayState>,
    body: JsonBody<SendMessageRequest>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return ChatError::from(rejection).into_response(),
    };

    match state.conversation.send_message(&req).await {
        Ok(outcome) => Json(SendMessageResponse {
            status: "success".to_string(),
            reply: outcome.reply,
            reply_recorded: outcome.reply_recorded,
            memory_recorded: outcome.memory_recorded,
        })
        .into_response(),
        Err(e @ ChatError::Validation(_)) => e.into_response(),
        Err(e) => {
            // The user's message was not stored; surface the store's report as-is.
            error!("send_message aborted before generation: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(StatusResponse::error(&e))).into_response()
        }
    }
}

async fn get_history(
    State(state): State<GatewayState>,
    body: JsonBody<SessionRequest>,
) -> Result<Json<HistoryResponse>> {
    let Json(req) = body?;
    let key = SessionKey::from_parts(req.persona.as_deref(), req.session_id.as_deref())?;
    let messages = state.conversation.history(&key).await;

    Ok(Json(HistoryResponse {
        status: "success".to_string(),
        messages,
    }))
}

async fn clear_history(
    State(state): State<GatewayState>,
    body: JsonBody<SessionRequest>,
) -> Result<Json<StatusResponse>> {
    let Json(req) = body?;
    let key = SessionKey::from_parts(req.persona.as_deref(), req.session_id.as_deref())?;
    state.conversation.clear_history(&key).await?;
    Ok(Json(StatusResponse::success()))
}

async fn get_sessions(
    State(state): State<GatewayState>,
    body: JsonBody<PersonaRequest>,
) -> Result<Json<SessionsResponse>> {
    let Json(req) = body?;
    let persona = require("persona", req.persona.as_deref())?;
    let sessions = state.conversation.sessions(persona).await;

    Ok(Json(SessionsResponse {
        status: "success".to_string(),
        sessions,
    }))
}

/// =============================
/// Audio Endpoint
/// =============================

async fn transcribe_audio(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>> {
    let mut audio = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChatError::Validation(format!("malformed multipart body: {}", e)))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ChatError::Validation(format!("unreadable audio field: {}", e)))?;
            audio = Some(bytes);
            break;
        }
    }

    let audio = audio.ok_or_else(|| ChatError::missing_field(AUDIO_FIELD))?;
    let text = state.conversation.transcribe(&audio).await?;

    Ok(Json(TranscribeResponse {
        status: "success".to_string(),
        text,
    }))
}

/// =============================
/// Router
/// =============================

pub fn create_router(conversation: Arc<ConversationService>, static_dir: &Path) -> Router {
    let state = GatewayState { conversation };

    Router::new()
        .route("/health", axum::routing::get(crate::health))
        .route("/api/send_message", post(send_message))
        .route("/api/get_history", post(get_history))
        .route("/api/clear_history", post(clear_history))
        .route("/api/get_sessions", post(get_sessions))
        .route(
            "/api/transcribe_audio",
            post(transcribe_audio).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/styles.css", ServeFile::new(static_dir.join("styles.css")))
        .route_service("/script.js", ServeFile::new(static_dir.join("script.js")))
        .fallback(crate::not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    conversation: Arc<ConversationService>,
    static_dir: &Path,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(conversation, static_dir);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("Gateway listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::conversation::tests::FixedTranscriber;
    use crate::gateway::reply::tests::{FakeMemory, ScriptedGenerator};
    use crate::gateway::reply::APOLOGY;
    use crate::gateway::{MemoryProxyClient, ReplyGenerator};
    use crate::proxy::MemoryService;
    use crate::store::InMemoryDocumentStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router_with(memory: Arc<FakeMemory>, generator: Arc<ScriptedGenerator>) -> Router {
        let conversation = ConversationService::new(
            memory.clone(),
            ReplyGenerator::new(generator, memory),
            Arc::new(FixedTranscriber("good morning")),
        );
        create_router(Arc::new(conversation), Path::new("."))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(path: &str, body: Value) -> Request<Body> {
        Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(field: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "X-CHAT-BOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"clip.webm\"\r\n\
                 Content-Type: audio/webm\r\n\r\n",
                field
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::post("/api/transcribe_audio")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_message_success() {
        let router = router_with(
            Arc::new(FakeMemory::default()),
            Arc::new(ScriptedGenerator::replying("hi there")),
        );

        let (status, body) = send(
            &router,
            post_json(
                "/api/send_message",
                json!({"message": "hello", "persona": "Lucy", "session_id": "s1"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["reply"], "hi there");
        assert_eq!(body["reply_recorded"], true);

        let (_, body) = send(
            &router,
            post_json("/api/get_history", json!({"persona": "Lucy", "session_id": "s1"})),
        )
        .await;
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["speaker"], "user");
        assert_eq!(messages[1]["speaker"], "Lucy");
    }

    #[tokio::test]
    async fn test_send_message_missing_persona_is_400() {
        let router = router_with(
            Arc::new(FakeMemory::default()),
            Arc::new(ScriptedGenerator::replying("unused")),
        );

        let (status, body) = send(
            &router,
            post_json("/api/send_message", json!({"message": "hello", "session_id": "s1"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let generator = Arc::new(ScriptedGenerator::replying("unused"));
        let router = router_with(Arc::new(FakeMemory::default()), generator.clone());

        let request = Request::post("/api/send_message")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "validation");

        let request = Request::post("/api/get_history")
            .header("content-type", "text/plain")
            .body(Body::from("persona=Lucy"))
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_store_failure_is_500() {
        let generator = Arc::new(ScriptedGenerator::replying("unused"));
        let router = router_with(
            Arc::new(FakeMemory {
                fail_writes: true,
                ..Default::default()
            }),
            generator.clone(),
        );

        let (status, body) = send(
            &router,
            post_json(
                "/api/send_message",
                json!({"message": "hello", "persona": "Lucy", "session_id": "s1"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "store");
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_degrade_when_proxy_down() {
        let router = router_with(
            Arc::new(FakeMemory {
                fail_reads: true,
                ..Default::default()
            }),
            Arc::new(ScriptedGenerator::replying("x")),
        );

        let (status, body) =
            send(&router, post_json("/api/get_sessions", json!({"persona": "Lucy"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessions"], json!([]));

        let (status, body) = send(
            &router,
            post_json("/api/get_history", json!({"persona": "Lucy", "session_id": "s1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_transcribe_audio() {
        let router = router_with(
            Arc::new(FakeMemory::default()),
            Arc::new(ScriptedGenerator::replying("x")),
        );

        let (status, body) = send(&router, multipart(AUDIO_FIELD, b"\x1a\x45\xdf\xa3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "text": "good morning"}));

        let (status, body) = send(&router, multipart(AUDIO_FIELD, b"")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "");

        let (status, body) = send(&router, multipart("other", b"abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn test_options_preflight_allowed() {
        let router = router_with(
            Arc::new(FakeMemory::default()),
            Arc::new(ScriptedGenerator::replying("x")),
        );

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/send_message")
                    .header("origin", "http://example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_end_to_end_with_live_proxy() {
        let proxy = crate::proxy::create_router(MemoryService::new(Arc::new(
            InMemoryDocumentStore::new(),
        )));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, proxy).await.unwrap();
        });

        let memory = Arc::new(MemoryProxyClient::new(&format!("http://{}", addr)).unwrap());
        let generator = Arc::new(ScriptedGenerator::failing());
        let conversation = ConversationService::new(
            memory.clone(),
            ReplyGenerator::new(generator, memory),
            Arc::new(FixedTranscriber("")),
        );
        let router = create_router(Arc::new(conversation), Path::new("."));

        let (status, body) = send(
            &router,
            post_json(
                "/api/send_message",
                json!({"message": "hello", "persona": "Zed", "session_id": "default"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], APOLOGY);
        assert_eq!(body["memory_recorded"], true);

        let (_, body) =
            send(&router, post_json("/api/get_sessions", json!({"persona": "Zed"}))).await;
        assert_eq!(body["sessions"], json!(["default"]));

        let (status, _) = send(
            &router,
            post_json("/api/clear_history", json!({"persona": "Zed", "session_id": "default"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(
            &router,
            post_json("/api/get_history", json!({"persona": "Zed", "session_id": "default"})),
        )
        .await;
        assert_eq!(body["messages"], json!([]));

        let (_, body) =
            send(&router, post_json("/api/get_sessions", json!({"persona": "Zed"}))).await;
        assert_eq!(body["sessions"], json!(["default"]));
    }
}
