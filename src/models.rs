//! Core data models shared by the gateway and the memory proxy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ChatError;
use crate::Result;

/// Session id whose record survives a history clear.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Speaker label for messages typed by the human.
pub const USER_SPEAKER: &str = "user";

pub const DEFAULT_MESSAGE_LIMIT: usize = 50;
pub const DEFAULT_MEMORY_LIMIT: usize = 10;

//
// ================= Session =================
//

/// Identifies one conversation thread: (persona, session_id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub persona: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(persona: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            session_id: session_id.into(),
        }
    }

    /// Build a key from optional request fields, rejecting absent or blank values.
    pub fn from_parts(persona: Option<&str>, session_id: Option<&str>) -> Result<Self> {
        Ok(Self::new(
            require("persona", persona)?,
            require("session_id", session_id)?,
        ))
    }

    pub fn is_default(&self) -> bool {
        self.session_id == DEFAULT_SESSION_ID
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.persona, self.session_id)
    }
}

/// Return the trimmed value of a required field, or a validation error.
pub fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ChatError::missing_field(field)),
    }
}

//
// ================= Messages =================
//

/// One chat turn. Immutable once written; `ts` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: String,
    pub text: String,
    pub ts: DateTime<Utc>,
}

/// One entry of the shared, persona-agnostic memory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub speaker: String,
    pub text: String,
    pub ts: DateTime<Utc>,
}

/// Render `speaker: text` lines joined by newlines, in iteration order.
pub fn render_transcript<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    lines
        .into_iter()
        .map(|(speaker, text)| format!("{}: {}", speaker, text))
        .collect::<Vec<_>>()
        .join("\n")
}

//
// ================= Wire Requests =================
//
// Every field is optional so that missing values surface as validation
// errors instead of body rejections.

/// `/mcp/add_message`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddMessageRequest {
    pub persona: Option<String>,
    pub session_id: Option<String>,
    pub speaker: Option<String>,
    pub text: Option<String>,
}

/// `/mcp/get_messages`, `/mcp/clear_history`, `/api/get_history`, `/api/clear_history`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRequest {
    pub persona: Option<String>,
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// `/mcp/get_sessions`, `/mcp/get_persona_memory`, `/api/get_sessions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaRequest {
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// `/mcp/add_persona_memory`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddMemoryRequest {
    pub persona: Option<String>,
    pub text: Option<String>,
}

/// `/api/send_message`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: Option<String>,
    pub persona: Option<String>,
    pub session_id: Option<String>,
}

//
// ================= Wire Responses =================
//

/// `{"status": "success" | "error", "message"?, "kind"?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            kind: None,
        }
    }

    pub fn error(err: &ChatError) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(err.detail()),
            kind: Some(err.kind().to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// `{"status": "success", "result": T}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse<T> {
    #[serde(default = "success_status")]
    pub status: String,
    pub result: T,
}

impl<T> ResultResponse<T> {
    pub fn new(result: T) -> Self {
        Self {
            status: success_status(),
            result,
        }
    }
}

fn success_status() -> String {
    "success".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_requires_both_parts() {
        assert!(SessionKey::from_parts(Some("Lucy"), Some("s1")).is_ok());

        let err = SessionKey::from_parts(None, Some("s1")).unwrap_err();
        assert!(err.to_string().contains("persona"));

        let err = SessionKey::from_parts(Some("Lucy"), Some("   ")).unwrap_err();
        assert!(err.to_string().contains("session_id"));
    }

    #[test]
    fn test_default_session_detection() {
        assert!(SessionKey::new("Roxy", "default").is_default());
        assert!(!SessionKey::new("Roxy", "s2").is_default());
    }

    #[test]
    fn test_render_transcript() {
        let text = render_transcript(vec![("user", "hello"), ("Lucy", "hi there")]);
        assert_eq!(text, "user: hello\nLucy: hi there");
        assert_eq!(render_transcript(Vec::<(&str, &str)>::new()), "");
    }

    #[test]
    fn test_message_timestamp_serializes_as_iso_text() {
        let msg = Message {
            speaker: "user".to_string(),
            text: "hello".to_string(),
            ts: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["ts"], "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_session_request_omits_missing_limit() {
        let req = SessionRequest {
            persona: Some("Lexi".into()),
            session_id: Some("s1".into()),
            limit: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("limit"));
    }

    #[test]
    fn test_result_response_tolerates_missing_status() {
        let parsed: ResultResponse<Vec<String>> =
            serde_json::from_str(r#"{"result":["default","s1"]}"#).unwrap();
        assert_eq!(parsed.status, "success");
        assert_eq!(parsed.result.len(), 2);
    }
}
