//! Process-local conversation store.

use std::collections::HashMap;
use std::sync::Arc;

use agentic_application::{ConversationMemory, MemoryError};
use agentic_domain::{Conversation, ConversationId, Turn};
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Conversations kept in memory for the lifetime of the process.
///
/// The outer lock only guards the id → conversation map; each conversation
/// has its own mutex so appends to different conversations never contend.
pub struct InMemoryConversationMemory {
    capacity: usize,
    conversations: RwLock<HashMap<ConversationId, Arc<Mutex<Conversation>>>>,
}

impl InMemoryConversationMemory {
    /// `capacity` is the per-conversation history length in turns.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    async fn get(&self, id: ConversationId) -> Result<Arc<Mutex<Conversation>>, MemoryError> {
        self.conversations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(MemoryError::NotFound(id))
    }
}

#[async_trait]
impl ConversationMemory for InMemoryConversationMemory {
    async fn create(&self) -> ConversationId {
        let id = ConversationId::new();
        self.ensure(id).await;
        id
    }

    async fn ensure(&self, id: ConversationId) {
        let mut conversations = self.conversations.write().await;
        conversations.entry(id).or_insert_with(|| {
            debug!(conversation_id = %id, capacity = self.capacity, "Created conversation");
            Arc::new(Mutex::new(Conversation::new(id, self.capacity)))
        });
    }

    async fn append(&self, id: ConversationId, turn: Turn) -> Result<u64, MemoryError> {
        let conversation = self.get(id).await?;
        let mut conversation = conversation.lock().await;
        Ok(conversation.append(turn))
    }

    async fn history(&self, id: ConversationId) -> Result<Vec<Turn>, MemoryError> {
        let conversation = self.get(id).await?;
        let conversation = conversation.lock().await;
        Ok(conversation.history())
    }

    async fn delete(&self, id: ConversationId) -> Result<(), MemoryError> {
        if self.conversations.write().await.remove(&id).is_none() {
            return Err(MemoryError::NotFound(id));
        }
        debug!(conversation_id = %id, "Deleted conversation");
        Ok(())
    }

    async fn list(&self) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self.conversations.read().await.keys().copied().collect();
        ids.sort();
        ids
    }
}
