//! Conversation service
//!
//! One chat turn is an explicit two-phase write:
//! 1. record the user's message (must succeed, otherwise the turn aborts)
//! 2. generate, then record the reply and append it to the shared log
//!
//! Phase 2 writes are best effort and reported back in `TurnOutcome`;
//! nothing written in phase 1 is rolled back.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::gateway::memory_client::MemoryApi;
use crate::gateway::reply::ReplyGenerator;
use crate::gateway::speech::Transcriber;
use crate::models::{
    require, Message, SendMessageRequest, SessionKey, DEFAULT_MESSAGE_LIMIT, USER_SPEAKER,
};
use crate::Result;

/// Result of a completed chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    /// The reply was stored as a message of the session.
    pub reply_recorded: bool,
    /// The reply was appended to the shared memory log.
    pub memory_recorded: bool,
}

pub struct ConversationService {
    memory: Arc<dyn MemoryApi>,
    replies: ReplyGenerator,
    transcriber: Arc<dyn Transcriber>,
}

impl ConversationService {
    pub fn new(
        memory: Arc<dyn MemoryApi>,
        replies: ReplyGenerator,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            memory,
            replies,
            transcriber,
        }
    }

    /// Run one chat turn. Errors only on validation or when the user's
    /// message could not be recorded; the generator is not called then.
    pub async fn send_message(&self, req: &SendMessageRequest) -> Result<TurnOutcome> {
        let text = require("message", req.message.as_deref())?;
        let key = SessionKey::from_parts(req.persona.as_deref(), req.session_id.as_deref())?;

        self.memory.add_message(&key, USER_SPEAKER, text).await?;

        let reply = self.replies.generate_reply(text, &key).await;

        let reply_recorded = match self.memory.add_message(&key, &key.persona, &reply).await {
            Ok(()) => true,
            Err(e) => {
                warn!(session = %key, "Reply not recorded in session history: {}", e);
                false
            }
        };

        let memory_recorded = match self.memory.add_persona_memory(&key.persona, &reply).await {
            Ok(()) => true,
            Err(e) => {
                warn!(persona = %key.persona, "Reply not recorded in shared memory: {}", e);
                false
            }
        };

        info!(session = %key, reply_recorded, memory_recorded, "Chat turn complete");

        Ok(TurnOutcome {
            reply,
            reply_recorded,
            memory_recorded,
        })
    }

    /// Session history, oldest first. Empty when the proxy is unavailable.
    pub async fn history(&self, key: &SessionKey) -> Vec<Message> {
        self.memory
            .get_messages(key, DEFAULT_MESSAGE_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!(session = %key, "History unavailable: {}", e);
                Vec::new()
            })
    }

    /// Known session ids for a persona. Empty when the proxy is unavailable.
    pub async fn sessions(&self, persona: &str) -> Vec<String> {
        self.memory.get_sessions(persona).await.unwrap_or_else(|e| {
            warn!(persona, "Sessions unavailable: {}", e);
            Vec::new()
        })
    }

    pub async fn clear_history(&self, key: &SessionKey) -> Result<()> {
        self.memory.clear_history(key).await
    }

    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.transcriber.transcribe(audio).await
    }
}
