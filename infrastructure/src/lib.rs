//! Infrastructure layer for agentic
//!
//! This crate contains the adapters that implement the ports defined in the
//! application layer: the process sandbox, the built-in tools and their
//! executor, the in-memory conversation store, the chat-completions oracle,
//! the JSONL transcript writer, and configuration file loading.

pub mod config;
pub mod logging;
pub mod memory;
pub mod oracle;
pub mod sandbox;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use logging::JsonlConversationLogger;
pub use memory::InMemoryConversationMemory;
#[cfg(feature = "openai-oracle")]
pub use oracle::OpenAiOracle;
pub use oracle::OracleSettings;
pub use sandbox::{SandboxError, SandboxExecutor};
pub use tools::{
    JsonSchemaToolConverter, SandboxedToolExecutor, ToolSettings, ToolSetupError, builtin_registry,
};
