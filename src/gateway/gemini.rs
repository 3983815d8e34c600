//! Gemini API client for reply generation
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use reqwest::Client;
use std::time::Duration;

use crate::error::ChatError;
use crate::Result;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Anything that turns a prompt into text.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host, e.g. a regional endpoint or a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(ChatError::Config("GEMINI_API_KEY not configured".to_string()));
        }

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        info!(model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                ChatError::Transport(format!("Gemini API request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response ({}): {}", status, error_text);
            return Err(ChatError::Upstream(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            ChatError::Upstream(format!("Gemini parse error: {}", e))
        })?;

        let answer = extract_text(&gemini_response)?;

        info!(
            finish_reason = ?gemini_response.candidates.first().and_then(|c| c.finish_reason.as_deref()),
            "Gemini response received"
        );

        Ok(answer)
    }
}

/// First text part of the first candidate, trimmed.
fn extract_text(response: &GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| ChatError::Upstream("No candidates in Gemini response".to_string()))?;

    let text = candidate
        .content
        .as_ref()
        .and_then(|c| c.parts.first())
        .map(|p| p.text.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ChatError::Upstream("Empty response from Gemini".to_string()));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}
