//! Document store persistence layer
//!
//! Low-level primitives over sessions, messages and the shared memory log.
//! Composition rules (clear semantics, ordering, flattening) live in
//! `proxy::MemoryService`, not here.

use crate::config::ProxyConfig;
use crate::models::{MemoryEntry, Message, SessionKey};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

/// Trait for document store backends
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the session record if absent and set its last-updated time to now.
    async fn touch_session(&self, key: &SessionKey) -> Result<()>;

    /// Append a message; the store assigns its timestamp.
    async fn insert_message(&self, key: &SessionKey, speaker: &str, text: &str) -> Result<()>;

    /// Up to `limit` messages in the backend's natural order. Which ones are
    /// selected when more exist is unspecified.
    async fn list_messages(&self, key: &SessionKey, limit: usize) -> Result<Vec<Message>>;

    /// Ids of every session record under `persona`.
    async fn list_sessions(&self, persona: &str) -> Result<Vec<String>>;

    /// Remove every message of the session; returns how many were removed.
    async fn delete_messages(&self, key: &SessionKey) -> Result<u64>;

    /// Remove the session record itself. Missing records are not an error.
    async fn delete_session(&self, key: &SessionKey) -> Result<()>;

    /// Append to the shared memory log.
    async fn insert_memory_entry(&self, speaker: &str, text: &str) -> Result<()>;

    /// The `limit` most recent memory entries, newest first.
    async fn recent_memory_entries(&self, limit: usize) -> Result<Vec<MemoryEntry>>;
}

/// Pick a backend from configuration: Postgres when a URL is given, else in-memory.
pub fn build_store(config: &ProxyConfig) -> Arc<dyn DocumentStore> {
    if let Some(url) = config.database_url.as_deref() {
        match PostgresDocumentStore::connect_lazy(url, config.max_connections) {
            Ok(store) => {
                info!("Document store backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres document store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Document store backend: in-memory");
    Arc::new(InMemoryDocumentStore::new())
}
