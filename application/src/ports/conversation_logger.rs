//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording conversation events
//! (user queries, oracle decisions, tool calls and results, answers) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! conversation transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// Event type identifiers written by the orchestrator.
pub mod event_types {
    pub const USER_QUERY: &str = "user_query";
    pub const ORACLE_DECISION: &str = "oracle_decision";
    pub const TOOL_CALL: &str = "tool_call";
    pub const TOOL_RESULT: &str = "tool_result";
    pub const STEP_LIMIT: &str = "step_limit";
    pub const ANSWER: &str = "answer";
    pub const QUERY_FAILED: &str = "query_failed";
}

/// A structured conversation event for logging.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields; the logger adds the timestamp.
pub struct ConversationEvent {
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging conversation events to a structured log.
///
/// Implementations write each event as a single record (e.g., one JSONL line).
/// `log` is synchronous and infallible; write failures are dropped.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
