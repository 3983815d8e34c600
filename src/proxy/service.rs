//! Memory store operations
//!
//! The six operations exposed by the proxy, composed from the
//! `DocumentStore` primitives.

use crate::models::{render_transcript, Message, SessionKey};
use crate::store::DocumentStore;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct MemoryService {
    store: Arc<dyn DocumentStore>,
}

impl MemoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Upsert the session's last-updated time, then append the message.
    pub async fn append_message(&self, key: &SessionKey, speaker: &str, text: &str) -> Result<()> {
        self.store.touch_session(key).await?;
        self.store.insert_message(key, speaker, text).await?;
        debug!(session = %key, speaker, "Message appended");
        Ok(())
    }

    /// Up to `limit` messages, oldest first.
    ///
    /// The store chooses which messages fill the limit; this only orders them.
    pub async fn list_messages(&self, key: &SessionKey, limit: usize) -> Result<Vec<Message>> {
        let mut messages = self.store.list_messages(key, limit).await?;
        messages.sort_by_key(|m| m.ts);
        Ok(messages)
    }

    pub async fn list_sessions(&self, persona: &str) -> Result<Vec<String>> {
        self.store.list_sessions(persona).await
    }

    /// Drop every message of the session. The session record goes too,
    /// except for the default session.
    pub async fn clear_history(&self, key: &SessionKey) -> Result<()> {
        let removed = self.store.delete_messages(key).await?;

        if !key.is_default() {
            self.store.delete_session(key).await?;
        }

        info!(session = %key, removed, "History cleared");
        Ok(())
    }

    /// Append to the shared log, tagged with the originating persona.
    pub async fn append_persona_memory(&self, persona: &str, text: &str) -> Result<()> {
        self.store.insert_memory_entry(persona, text).await
    }

    /// The most recent `limit` shared entries as a chronological
    /// `speaker: text` transcript. `persona` does not filter anything.
    pub async fn persona_memory(&self, persona: &str, limit: usize) -> Result<String> {
        let mut entries = self.store.recent_memory_entries(limit).await?;
        entries.reverse();

        debug!(persona, entries = entries.len(), "Shared memory fetched");

        Ok(render_transcript(
            entries.iter().map(|e| (e.speaker.as_str(), e.text.as_str())),
        ))
    }
}
