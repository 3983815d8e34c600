//! Reply orchestration
//!
//! PERSONA STYLE → RECENT HISTORY → SHARED MEMORY → PROMPT → GENERATE
//!
//! Reads degrade to empty context; any generation failure degrades to a
//! fixed apology. Nothing here returns an error to the caller.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::ChatError;
use crate::gateway::gemini::TextGenerator;
use crate::gateway::memory_client::MemoryApi;
use crate::models::{render_transcript, SessionKey};
use crate::personas;
use crate::Result;

/// Recent messages pulled into the prompt.
pub const HISTORY_LIMIT: usize = 20;
/// Shared memory entries pulled into the prompt.
pub const MEMORY_LIMIT: usize = 10;

pub const APOLOGY: &str = "I'm sorry, I encountered an error and couldn't think of a reply.";

pub struct ReplyGenerator {
    generator: Arc<dyn TextGenerator>,
    memory: Arc<dyn MemoryApi>,
}

impl ReplyGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, memory: Arc<dyn MemoryApi>) -> Self {
        Self { generator, memory }
    }

    /// Generate an in-character reply, or the apology text on failure.
    pub async fn generate_reply(&self, user_text: &str, key: &SessionKey) -> String {
        info!(persona = %key.persona, session_id = %key.session_id, "Generating reply");

        match self.try_generate(user_text, key).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(persona = %key.persona, kind = e.kind(), "Reply generation failed: {}", e);
                APOLOGY.to_string()
            }
        }
    }

    async fn try_generate(&self, user_text: &str, key: &SessionKey) -> Result<String> {
        let style = personas::style_for(&key.persona);

        let history = match self.memory.get_messages(key, HISTORY_LIMIT).await {
            Ok(messages) => render_transcript(
                messages.iter().map(|m| (m.speaker.as_str(), m.text.as_str())),
            ),
            Err(e) => {
                warn!("History unavailable, continuing without it: {}", e);
                String::new()
            }
        };

        let shared_memory = self
            .memory
            .get_persona_memory(&key.persona, MEMORY_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!("Shared memory unavailable, continuing without it: {}", e);
                String::new()
            });

        let prompt = build_prompt(&key.persona, style, &shared_memory, &history, user_text);

        let reply = self.generator.generate(&prompt).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(ChatError::Upstream("generation returned empty text".to_string()));
        }

        Ok(reply.to_string())
    }
}

/// Assemble the single prompt sent to the generation model.
pub fn build_prompt(
    persona: &str,
    style: &str,
    shared_memory: &str,
    history: &str,
    user_text: &str,
) -> String {
    format!(
        "You are {persona}, {style}. Speak as yourself only.\n\n\
         This is a shared memory log from all AI personas:\n{shared_memory}\n\n\
         Group chat so far:\n{history}\n\
         User just said: {user_text}\n\
         Reply in 2–3 sentences."
    )
}
