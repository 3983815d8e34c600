//! Speech-to-text client
//!
//! Calls the Google Speech `speech:recognize` REST endpoint. Audio is
//! assumed to be browser-recorded WEBM/Opus at 48 kHz.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::ChatError;
use crate::Result;

pub const SPEECH_BASE_URL: &str = "https://speech.googleapis.com/v1";

const AUDIO_ENCODING: &str = "WEBM_OPUS";
const SAMPLE_RATE_HERTZ: u32 = 48_000;
const LANGUAGE_CODE: &str = "en-US";

/// Anything that turns recorded audio into text.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// First alternative of the first result, or `""` when nothing was recognized.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

pub struct SpeechClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SpeechClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: SPEECH_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl Transcriber for SpeechClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: AUDIO_ENCODING,
                sample_rate_hertz: SAMPLE_RATE_HERTZ,
                language_code: LANGUAGE_CODE,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(audio),
            },
        };

        let url = format!("{}/speech:recognize?key={}", self.base_url, self.api_key);

        debug!(bytes = audio.len(), "Sending audio to speech service");

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Speech API request failed: {}", e);
                ChatError::Transport(format!("Speech API request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Speech API error response ({}): {}", status, error_text);
            return Err(ChatError::Upstream(format!(
                "Speech API returned {}: {}",
                status, error_text
            )));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Upstream(format!("Speech API parse error: {}", e)))?;

        Ok(first_transcript(parsed))
    }
}

fn first_transcript(response: RecognizeResponse) -> String {
    response
        .results
        .into_iter()
        .next()
        .and_then(|r| r.alternatives.into_iter().next())
        .map(|a| a.transcript)
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'static str,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}
