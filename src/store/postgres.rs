//! Postgres-backed document store
//!
//! Sessions, messages and the shared memory log each get one table.
//! Timestamps come from the database clock.

use crate::error::ChatError;
use crate::models::{MemoryEntry, Message, SessionKey};
use crate::store::DocumentStore;
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

pub struct PostgresDocumentStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresDocumentStore {
    /// Build a lazily connecting pool; nothing touches the network until first use.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)?;

        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        let pool = &self.pool;

        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS chat_sessions (
                      persona TEXT NOT NULL,
                      session_id TEXT NOT NULL,
                      last_updated TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
                      PRIMARY KEY (persona, session_id)
                    );
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS chat_messages (
                      message_id UUID PRIMARY KEY,
                      persona TEXT NOT NULL,
                      session_id TEXT NOT NULL,
                      speaker TEXT NOT NULL,
                      text TEXT NOT NULL,
                      ts TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
                    );
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_chat_messages_session
                    ON chat_messages (persona, session_id);
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS shared_memory_entries (
                      entry_id UUID PRIMARY KEY,
                      speaker TEXT NOT NULL,
                      text TEXT NOT NULL,
                      ts TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
                    );
                    "#,
                )
                .execute(pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| store_error("Failed to initialize document store schema", e))?;

        Ok(())
    }
}

fn store_error(context: &str, e: sqlx::Error) -> ChatError {
    ChatError::Store(format!("{}: {}", context, e))
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn touch_session(&self, key: &SessionKey) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_sessions (persona, session_id, last_updated)
            VALUES ($1, $2, clock_timestamp())
            ON CONFLICT (persona, session_id)
            DO UPDATE SET last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&key.persona)
        .bind(&key.session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to upsert session", e))?;

        Ok(())
    }

    async fn insert_message(&self, key: &SessionKey, speaker: &str, text: &str) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (message_id, persona, session_id, speaker, text)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&key.persona)
        .bind(&key.session_id)
        .bind(speaker)
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to insert message", e))?;

        Ok(())
    }

    async fn list_messages(&self, key: &SessionKey, limit: usize) -> Result<Vec<Message>> {
        self.ensure_schema().await?;

        // No ORDER BY: the selection under LIMIT is left to the database.
        let rows = sqlx::query(
            r#"
            SELECT speaker, text, ts
            FROM chat_messages
            WHERE persona = $1 AND session_id = $2
            LIMIT $3
            "#,
        )
        .bind(&key.persona)
        .bind(&key.session_id)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load messages", e))?;

        rows.into_iter()
            .map(|row| -> std::result::Result<Message, sqlx::Error> {
                Ok(Message {
                    speaker: row.try_get("speaker")?,
                    text: row.try_get("text")?,
                    ts: row.try_get::<DateTime<Utc>, _>("ts")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| store_error("Malformed message row", e))
    }

    async fn list_sessions(&self, persona: &str) -> Result<Vec<String>> {
        self.ensure_schema().await?;

        let rows = sqlx::query("SELECT session_id FROM chat_sessions WHERE persona = $1")
            .bind(persona)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to list sessions", e))?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("session_id"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| store_error("Malformed session row", e))
    }

    async fn delete_messages(&self, key: &SessionKey) -> Result<u64> {
        self.ensure_schema().await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction for clearing messages", e))?;

        let deleted = sqlx::query(
            "DELETE FROM chat_messages WHERE persona = $1 AND session_id = $2",
        )
        .bind(&key.persona)
        .bind(&key.session_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to delete messages", e))?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit message deletion", e))?;

        Ok(deleted)
    }

    async fn delete_session(&self, key: &SessionKey) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query("DELETE FROM chat_sessions WHERE persona = $1 AND session_id = $2")
            .bind(&key.persona)
            .bind(&key.session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete session", e))?;

        Ok(())
    }

    async fn insert_memory_entry(&self, speaker: &str, text: &str) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            "INSERT INTO shared_memory_entries (entry_id, speaker, text) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(speaker)
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to insert memory entry", e))?;

        Ok(())
    }

    async fn recent_memory_entries(&self, limit: usize) -> Result<Vec<MemoryEntry>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT speaker, text, ts
            FROM shared_memory_entries
            ORDER BY ts DESC
            LIMIT $1
            "#,
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load memory entries", e))?;

        rows.into_iter()
            .map(|row| -> std::result::Result<MemoryEntry, sqlx::Error> {
                Ok(MemoryEntry {
                    speaker: row.try_get("speaker")?,
                    text: row.try_get("text")?,
                    ts: row.try_get::<DateTime<Utc>, _>("ts")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| store_error("Malformed memory row", e))
    }
}
