//! Domain layer for agentic
//!
//! This crate contains the core entities and value objects of the agent
//! orchestrator. It has no dependencies on infrastructure or presentation
//! concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A [`ToolSpec`] declares a tool's parameters and the [`ToolKind`] that
//! implements it. Specs live in a [`ToolRegistry`] built once at startup.
//! Every [`ToolCall`] produces exactly one [`ToolResult`].
//!
//! ## Sandbox
//!
//! A [`SandboxPolicy`] bounds a tool's wall-clock time, memory and the
//! capabilities it may use. Deny always wins over allow.
//!
//! ## Conversations
//!
//! A [`Conversation`] is a bounded log of [`Turn`]s with FIFO eviction of
//! whole turns.
//!
//! ## Orchestration
//!
//! [`OrchestratorState`] and [`QueryRun`] model the per-query state machine;
//! [`OracleDecision`] is what the oracle answers at each planning step.

pub mod config;
pub mod conversation;
pub mod core;
pub mod orchestration;
pub mod sandbox;
pub mod tool;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use conversation::{Conversation, ConversationId, Role, Turn};
pub use core::{error::DomainError, query::Query};
pub use orchestration::{OracleDecision, OrchestratorState, QueryRun, RequestedCall};
pub use sandbox::SandboxPolicy;
pub use tool::{
    Arguments, CallId, DefaultToolValidator, MEMORY_LIMIT_EXCEEDED, ParamType, RegistryError,
    SideEffect, ToolCall, ToolError, ToolKind, ToolParameter, ToolRegistry, ToolResult,
    ToolResultMetadata, ToolSpec, ToolStatus, ToolValidator, names,
};
