//! Conversation memory adapters

mod in_memory;

pub use in_memory::InMemoryConversationMemory;
