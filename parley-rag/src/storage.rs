//! SQLite-backed message log storage

use crate::history::MessageLogStore;
use async_trait::async_trait;
use chrono::Utc;
use parley_core::{
    is_valid_identifier, ChatMessage, ConversationKey, ExternalService, MessageRole, ParleyError,
    ParleyResult,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use std::str::FromStr;
use tracing::{debug, info};

/// Message logs persisted in one SQLite table
///
/// Rows are `(id, session_id, role, content, created_at)`; `id` is
/// autoincrementing, so ordering by it replays each log in append order.
pub struct SqliteMessageLogStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteMessageLogStore {
    /// Connect to `database_url` and make sure the `collection` table exists.
    pub async fn connect(database_url: &str, collection: &str) -> ParleyResult<Self> {
        info!("Connecting to message store: {}", database_url);

        let pool = if database_url.contains(":memory:") {
            // Every pooled connection would otherwise open its own empty database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await
        } else {
            let db_path = database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
                .unwrap_or(database_url);

            if let Some(parent) = std::path::Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    info!("Creating parent directory: {}", parent.display());
                    std::fs::create_dir_all(parent)?;
                }
            }

            let options = SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true);
            SqlitePool::connect_with(options).await
        }
        .map_err(store_error)?;

        Self::from_pool(pool, collection).await
    }

    /// Use an existing pool, creating the table if needed.
    pub async fn from_pool(pool: SqlitePool, collection: &str) -> ParleyResult<Self> {
        // The table name is spliced into SQL text
        if !is_valid_identifier(collection) || collection.contains('-') {
            return Err(parley_core::config_error!(
                format!("Invalid message store collection name: {:?}", collection),
                "storage"
            ));
        }

        let store = Self {
            pool,
            table: collection.to_string(),
        };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> ParleyResult<()> {
        debug!("Creating {} table...", self.table);

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            table = self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_session ON {table} (session_id)",
            table = self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MessageLogStore for SqliteMessageLogStore {
    async fn load(&self, key: &ConversationKey) -> ParleyResult<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT role, content FROM {} WHERE session_id = ? ORDER BY id ASC",
            self.table
        ))
        .bind(key.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter()
            .map(|row| -> ParleyResult<ChatMessage> {
                let role: String = row.get("role");
                let role = MessageRole::from_str(&role).map_err(|e| {
                    ParleyError::external_msg(ExternalService::MessageStore, "storage", e)
                })?;
                Ok(ChatMessage {
                    role,
                    content: row.get("content"),
                })
            })
            .collect()
    }

    async fn append(&self, key: &ConversationKey, messages: &[ChatMessage]) -> ParleyResult<()> {
        let insert = format!(
            "INSERT INTO {} (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
            self.table
        );
        let created_at = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(store_error)?;
        for message in messages {
            sqlx::query(&insert)
                .bind(key.as_str())
                .bind(message.role.as_str())
                .bind(&message.content)
                .bind(&created_at)
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
        }
        tx.commit().await.map_err(store_error)?;

        debug!("Stored {} messages for {}", messages.len(), key);
        Ok(())
    }

    async fn clear(&self, key: &ConversationKey) -> ParleyResult<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE session_id = ?", self.table))
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

fn store_error(e: sqlx::Error) -> ParleyError {
    ParleyError::external(ExternalService::MessageStore, "storage", e)
}
