//! Type definitions for the RunQuery use case.

use crate::ports::conversation_memory::MemoryError;
use crate::ports::oracle::OracleError;
use agentic_domain::{ConversationId, DomainError, OrchestratorState, Query, ToolResult};
use serde::Serialize;
use thiserror::Error;

/// Errors that end a query.
///
/// Tool failures never appear here: they are recorded as observations and
/// the loop continues. Every variant leaves previously committed turns
/// untouched.
#[derive(Error, Debug)]
pub enum RunQueryError {
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(OracleError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Internal orchestration error: {0}")]
    Internal(#[from] DomainError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunQueryError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunQueryError::Cancelled)
    }

    /// The single explanatory message shown to the end user.
    pub fn user_message(&self) -> String {
        match self {
            RunQueryError::OracleUnavailable(OracleError::Timeout) => {
                "The assistant took too long to respond. Your conversation has been kept; please try again.".to_string()
            }
            RunQueryError::OracleUnavailable(_) => {
                "The assistant is currently unavailable. Your conversation has been kept; please try again later.".to_string()
            }
            RunQueryError::Memory(MemoryError::NotFound(id)) => {
                format!("Conversation {} no longer exists.", id)
            }
            RunQueryError::Internal(_) => {
                "Something went wrong while processing your query.".to_string()
            }
            RunQueryError::Cancelled => "The query was cancelled.".to_string(),
        }
    }
}

/// Input for the RunQuery use case
#[derive(Debug, Clone)]
pub struct RunQueryInput {
    /// Existing conversation to continue; a new one is created when `None`
    pub conversation_id: Option<ConversationId>,
    pub query: Query,
}

impl RunQueryInput {
    pub fn new(query: Query) -> Self {
        Self {
            conversation_id: None,
            query,
        }
    }

    pub fn with_conversation(mut self, id: ConversationId) -> Self {
        self.conversation_id = Some(id);
        self
    }
}

/// Outcome of one successfully terminated query.
#[derive(Debug, Clone, Serialize)]
pub struct RunQueryOutput {
    pub conversation_id: ConversationId,
    pub query: String,
    pub answer: String,
    /// Tool-execution steps taken
    pub steps: usize,
    /// Distinct registered tools that were called, in first-use order
    pub tools_used: Vec<String>,
    /// Every tool result of this query, in request order
    pub tool_results: Vec<ToolResult>,
    /// The answer is a best-effort summary because the step budget ran out
    pub step_limit_reached: bool,
    pub final_state: OrchestratorState,
}
