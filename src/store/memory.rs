//! In-memory document store for development and tests

use crate::models::{MemoryEntry, Message, SessionKey};
use crate::store::DocumentStore;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct InMemoryDocumentStore {
    /// (persona, session_id) → last updated
    sessions: Arc<RwLock<HashMap<SessionKey, DateTime<Utc>>>>,
    messages: Arc<RwLock<HashMap<SessionKey, Vec<Message>>>>,
    memory_log: Arc<RwLock<Vec<MemoryEntry>>>,
    clock: Mutex<Option<DateTime<Utc>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            messages: Arc::new(RwLock::new(HashMap::new())),
            memory_log: Arc::new(RwLock::new(Vec::new())),
            clock: Mutex::new(None),
        }
    }

    /// Server timestamp, never earlier than the previous one handed out.
    async fn now(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock().await;
        let now = match *last {
            Some(prev) => Utc::now().max(prev),
            None => Utc::now(),
        };
        *last = Some(now);
        now
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn touch_session(&self, key: &SessionKey) -> Result<()> {
        let now = self.now().await;
        let mut sessions = self.sessions.write().await;
        sessions.insert(key.clone(), now);
        Ok(())
    }

    async fn insert_message(&self, key: &SessionKey, speaker: &str, text: &str) -> Result<()> {
        let ts = self.now().await;
        let mut messages = self.messages.write().await;
        messages.entry(key.clone()).or_default().push(Message {
            speaker: speaker.to_string(),
            text: text.to_string(),
            ts,
        });
        Ok(())
    }

    async fn list_messages(&self, key: &SessionKey, limit: usize) -> Result<Vec<Message>> {
        let messages = self.messages.read().await;
        Ok(messages
            .get(key)
            .map(|msgs| msgs.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_sessions(&self, persona: &str) -> Result<Vec<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .keys()
            .filter(|key| key.persona == persona)
            .map(|key| key.session_id.clone())
            .collect())
    }

    async fn delete_messages(&self, key: &SessionKey) -> Result<u64> {
        let mut messages = self.messages.write().await;
        Ok(messages.remove(key).map(|m| m.len() as u64).unwrap_or(0))
    }

    async fn delete_session(&self, key: &SessionKey) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(key);
        Ok(())
    }

    async fn insert_memory_entry(&self, speaker: &str, text: &str) -> Result<()> {
        let ts = self.now().await;
        let mut log = self.memory_log.write().await;
        log.push(MemoryEntry {
            speaker: speaker.to_string(),
            text: text.to_string(),
            ts,
        });
        Ok(())
    }

    async fn recent_memory_entries(&self, limit: usize) -> Result<Vec<MemoryEntry>> {
        let log = self.memory_log.read().await;
        Ok(log.iter().rev().take(limit).cloned().collect())
    }
}
