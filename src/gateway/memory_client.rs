//! HTTP client for the memory store proxy

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use crate::error::ChatError;
use crate::models::{
    AddMemoryRequest, AddMessageRequest, Message, PersonaRequest, ResultResponse, SessionKey,
    SessionRequest, StatusResponse,
};
use crate::Result;

/// Operations the gateway needs from the memory store.
#[async_trait::async_trait]
pub trait MemoryApi: Send + Sync {
    async fn add_message(&self, key: &SessionKey, speaker: &str, text: &str) -> Result<()>;
    async fn get_messages(&self, key: &SessionKey, limit: usize) -> Result<Vec<Message>>;
    async fn get_sessions(&self, persona: &str) -> Result<Vec<String>>;
    async fn clear_history(&self, key: &SessionKey) -> Result<()>;
    async fn add_persona_memory(&self, persona: &str, text: &str) -> Result<()>;
    async fn get_persona_memory(&self, persona: &str, limit: usize) -> Result<String>;
}

#[derive(Clone)]
pub struct MemoryProxyClient {
    client: Client,
    base_url: String,
}

impl MemoryProxyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Memory proxy request failed for {}: {}", path, e);
                ChatError::Transport(format!("Memory proxy request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            ChatError::Transport(format!("Memory proxy body read failed for {}: {}", path, e))
        })?;

        if !status.is_success() {
            // The proxy reports failures as a StatusResponse; keep its kind.
            return Err(match serde_json::from_slice::<StatusResponse>(&bytes) {
                Ok(payload) => ChatError::from_payload(
                    payload.kind.as_deref(),
                    payload
                        .message
                        .unwrap_or_else(|| format!("memory proxy returned {}", status)),
                ),
                Err(_) => ChatError::Upstream(format!(
                    "Memory proxy returned {} for {}: {}",
                    status,
                    path,
                    String::from_utf8_lossy(&bytes)
                )),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            ChatError::Upstream(format!("Invalid JSON from memory proxy for {}: {}", path, e))
        })
    }

    async fn post_status<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + Sync,
    {
        let payload: StatusResponse = self.post_json(path, body).await?;
        if payload.is_error() {
            return Err(ChatError::from_payload(
                payload.kind.as_deref(),
                payload.message.unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MemoryApi for MemoryProxyClient {
    async fn add_message(&self, key: &SessionKey, speaker: &str, text: &str) -> Result<()> {
        let body = AddMessageRequest {
            persona: Some(key.persona.clone()),
            session_id: Some(key.session_id.clone()),
            speaker: Some(speaker.to_string()),
            text: Some(text.to_string()),
        };
        self.post_status("/mcp/add_message", &body).await
    }

    async fn get_messages(&self, key: &SessionKey, limit: usize) -> Result<Vec<Message>> {
        let body = SessionRequest {
            persona: Some(key.persona.clone()),
            session_id: Some(key.session_id.clone()),
            limit: Some(limit),
        };
        let payload: ResultResponse<Vec<Message>> =
            self.post_json("/mcp/get_messages", &body).await?;
        Ok(payload.result)
    }

    async fn get_sessions(&self, persona: &str) -> Result<Vec<String>> {
        let body = PersonaRequest {
            persona: Some(persona.to_string()),
            limit: None,
        };
        let payload: ResultResponse<Vec<String>> =
            self.post_json("/mcp/get_sessions", &body).await?;
        Ok(payload.result)
    }

    async fn clear_history(&self, key: &SessionKey) -> Result<()> {
        let body = SessionRequest {
            persona: Some(key.persona.clone()),
            session_id: Some(key.session_id.clone()),
            limit: None,
        };
        self.post_status("/mcp/clear_history", &body).await
    }

    async fn add_persona_memory(&self, persona: &str, text: &str) -> Result<()> {
        let body = AddMemoryRequest {
            persona: Some(persona.to_string()),
            text: Some(text.to_string()),
        };
        self.post_status("/mcp/add_persona_memory", &body).await
    }

    async fn get_persona_memory(&self, persona: &str, limit: usize) -> Result<String> {
        let body = PersonaRequest {
            persona: Some(persona.to_string()),
            limit: Some(limit),
        };
        let payload: ResultResponse<String> =
            self.post_json("/mcp/get_persona_memory", &body).await?;
        Ok(payload.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{create_router, MemoryService};
    use crate::store::InMemoryDocumentStore;
    use std::sync::Arc;

    async fn spawn_proxy() -> MemoryProxyClient {
        let router = create_router(MemoryService::new(Arc::new(InMemoryDocumentStore::new())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        MemoryProxyClient::new(&format!("http://{}/", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_through_proxy() {
        let client = spawn_proxy().await;
        let key = SessionKey::new("Lucy", "s1");

        client.add_message(&key, "user", "hello").await.unwrap();
        client.add_message(&key, "Lucy", "hi there").await.unwrap();

        let msgs = client.get_messages(&key, 50).await.unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].text, "hello");
        assert_eq!(msgs[1].speaker, "Lucy");

        assert_eq!(client.get_sessions("Lucy").await.unwrap(), vec!["s1".to_string()]);

        client.clear_history(&key).await.unwrap();
        assert!(client.get_sessions("Lucy").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_memory_through_proxy() {
        let client = spawn_proxy().await;
        client.add_persona_memory("Roxy", "I climbed a wall").await.unwrap();

        let text = client.get_persona_memory("Lexi", 10).await.unwrap();
        assert_eq!(text, "Roxy: I climbed a wall");
    }

    #[tokio::test]
    async fn test_proxy_error_keeps_kind() {
        let client = spawn_proxy().await;
        let err = client
            .add_message(&SessionKey::new("Lucy", ""), "user", "hello")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_transport() {
        let client = MemoryProxyClient::new("http://127.0.0.1:1").unwrap();
        let err = client.get_sessions("Lucy").await.unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert!(err.is_retryable());
    }
}
