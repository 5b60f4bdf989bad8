//! Application layer for agentic
//!
//! This crate contains the orchestration use case, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::OrchestratorConfig;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    conversation_memory::{ConversationMemory, MemoryError},
    oracle::{Oracle, OracleError, ScriptedOracle},
    progress::{NoProgress, ProgressNotifier},
    tool_executor::ToolExecutorPort,
    tool_schema::ToolSchemaPort,
};
pub use use_cases::run_query::{RunQueryError, RunQueryInput, RunQueryOutput, RunQueryUseCase};
