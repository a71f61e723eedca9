//! Conversation history
//!
//! A [`HistoryResolver`] maps a `(user_id, conversation_id)` pair to a
//! [`MessageLog`] handle. The handle is cheap: it holds the derived key and a
//! shared store and reads or writes the store on every call.

use async_trait::async_trait;
use parley_core::{ChatMessage, ConversationKey, ParleyResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Durable storage of ordered message logs keyed by conversation
#[async_trait]
pub trait MessageLogStore: Send + Sync {
    /// All messages for `key` in append order; empty when none were stored.
    async fn load(&self, key: &ConversationKey) -> ParleyResult<Vec<ChatMessage>>;

    /// Append `messages` to the end of the log for `key` as one unit.
    async fn append(&self, key: &ConversationKey, messages: &[ChatMessage]) -> ParleyResult<()>;

    /// Remove every message stored for `key`.
    async fn clear(&self, key: &ConversationKey) -> ParleyResult<()>;
}

/// Handle on one conversation's message log
#[derive(Clone)]
pub struct MessageLog {
    key: ConversationKey,
    store: Arc<dyn MessageLogStore>,
}

impl MessageLog {
    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub async fn messages(&self) -> ParleyResult<Vec<ChatMessage>> {
        self.store.load(&self.key).await
    }

    pub async fn add_messages(&self, messages: &[ChatMessage]) -> ParleyResult<()> {
        debug!("Appending {} messages to {}", messages.len(), self.key);
        self.store.append(&self.key, messages).await
    }

    pub async fn clear(&self) -> ParleyResult<()> {
        self.store.clear(&self.key).await
    }
}

impl std::fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLog").field("key", &self.key).finish()
    }
}

/// Resolves identifier pairs to message log handles
#[derive(Clone)]
pub struct HistoryResolver {
    store: Arc<dyn MessageLogStore>,
}

impl HistoryResolver {
    pub fn new(store: Arc<dyn MessageLogStore>) -> Self {
        Self { store }
    }

    /// Validate both identifiers and return the log for their session key.
    ///
    /// The user id is checked first. Nothing touches the store on failure.
    pub fn resolve(&self, user_id: &str, conversation_id: &str) -> ParleyResult<MessageLog> {
        let key = ConversationKey::new(user_id, conversation_id)?;
        Ok(MessageLog {
            key,
            store: Arc::clone(&self.store),
        })
    }
}

/// Message logs held in process memory
#[derive(Default)]
pub struct InMemoryMessageLogStore {
    logs: RwLock<HashMap<ConversationKey, Vec<ChatMessage>>>,
}

impl InMemoryMessageLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageLogStore for InMemoryMessageLogStore {
    async fn load(&self, key: &ConversationKey) -> ParleyResult<Vec<ChatMessage>> {
        Ok(self.logs.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn append(&self, key: &ConversationKey, messages: &[ChatMessage]) -> ParleyResult<()> {
        self.logs
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn clear(&self, key: &ConversationKey) -> ParleyResult<()> {
        self.logs.write().await.remove(key);
        Ok(())
    }
}
