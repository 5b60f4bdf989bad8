//! Conversation Memory port
//!
//! Bounded per-conversation turn storage. Implementations serialize
//! mutations per conversation and evict the oldest whole turns after every
//! append.

use agentic_domain::{ConversationId, Turn};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),
}

#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Create a new, empty conversation
    async fn create(&self) -> ConversationId;

    /// Create the conversation if it does not exist yet
    async fn ensure(&self, id: ConversationId);

    /// Append a turn; returns the sequence number it was assigned
    async fn append(&self, id: ConversationId, turn: Turn) -> Result<u64, MemoryError>;

    /// Visible history, oldest first
    async fn history(&self, id: ConversationId) -> Result<Vec<Turn>, MemoryError>;

    /// Delete a conversation; its turns are unreachable afterwards
    async fn delete(&self, id: ConversationId) -> Result<(), MemoryError>;

    /// Known conversation ids
    async fn list(&self) -> Vec<ConversationId>;
}
