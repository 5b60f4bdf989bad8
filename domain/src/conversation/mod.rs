//! Conversation domain module
//!
//! A [`Conversation`] is a bounded, ordered log of [`Turn`]s. Appends assign
//! strictly increasing sequence numbers; once the configured history length
//! is exceeded, the oldest whole turns are evicted first.

pub mod entities;

pub use entities::{Conversation, ConversationId, Role, Turn};
