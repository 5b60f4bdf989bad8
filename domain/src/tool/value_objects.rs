//! Tool domain value objects: execution outcome and error taxonomy
//!
//! Every dispatched [`ToolCall`](super::entities::ToolCall) produces exactly
//! one [`ToolResult`] carrying the same [`CallId`]. Failures never escape as
//! panics or raw errors; they are folded into a result whose [`ToolStatus`]
//! is derived from the [`ToolError`] variant:
//!
//! | Error | Status | `error_detail` |
//! |-------|--------|----------------|
//! | `UnknownTool`, `Validation`, `Provider`, `RowLimitExceeded`, `Execution` | `error` | message |
//! | `Timeout` | `timeout` | message |
//! | `MemoryLimit` | `error` | `memory_limit_exceeded` |
//! | `CapabilityDenied` | `denied` | message |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::entities::CallId;

/// Fixed `error_detail` for results aborted by the memory ceiling.
pub const MEMORY_LIMIT_EXCEEDED: &str = "memory_limit_exceeded";

/// Outcome class of a tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    Error,
    Timeout,
    Denied,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Ok => "ok",
            ToolStatus::Error => "error",
            ToolStatus::Timeout => "timeout",
            ToolStatus::Denied => "denied",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ToolStatus::Ok)
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool-level errors. All of them are recoverable from the conversation's
/// point of view: the orchestrator turns them into observations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {message}")]
    Validation { tool: String, message: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("memory limit of {limit_mb} MB exceeded")]
    MemoryLimit { limit_mb: u64 },

    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    #[error("table has {rows} rows, limit is {max}")]
    RowLimitExceeded { rows: usize, max: usize },

    #[error("execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn validation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> ToolStatus {
        match self {
            ToolError::Timeout { .. } => ToolStatus::Timeout,
            ToolError::CapabilityDenied(_) => ToolStatus::Denied,
            _ => ToolStatus::Error,
        }
    }

    /// Stable machine-readable code, used in logs and observations.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "UNKNOWN_TOOL",
            ToolError::Validation { .. } => "INVALID_ARGUMENT",
            ToolError::Provider(_) => "PROVIDER_ERROR",
            ToolError::Timeout { .. } => "TIMEOUT",
            ToolError::MemoryLimit { .. } => "MEMORY_LIMIT",
            ToolError::CapabilityDenied(_) => "PERMISSION_DENIED",
            ToolError::RowLimitExceeded { .. } => "ROW_LIMIT_EXCEEDED",
            ToolError::Execution(_) => "EXECUTION_FAILED",
        }
    }

    /// Text stored in [`ToolResult::error_detail`].
    pub fn detail(&self) -> String {
        match self {
            ToolError::MemoryLimit { .. } => MEMORY_LIMIT_EXCEEDED.to_string(),
            other => other.to_string(),
        }
    }
}

/// Structured metadata about tool execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Machine-readable error code, set on failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Result of one tool call.
///
/// `error_detail` is present iff `status` is not `ok`; a result can only be
/// built through [`ToolResult::ok`] or [`ToolResult::failed`], which uphold
/// that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    call_id: CallId,
    tool_name: String,
    status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
    #[serde(default)]
    metadata: ToolResultMetadata,
}

impl ToolResult {
    pub fn ok(call_id: CallId, tool_name: impl Into<String>, payload: Value) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            status: ToolStatus::Ok,
            payload: Some(payload),
            error_detail: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn failed(call_id: CallId, tool_name: impl Into<String>, error: &ToolError) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            status: error.status(),
            payload: None,
            error_detail: Some(error.detail()),
            metadata: ToolResultMetadata {
                duration_ms: None,
                error_code: Some(error.code().to_string()),
            },
        }
    }

    pub fn from_outcome(
        call_id: CallId,
        tool_name: impl Into<String>,
        outcome: Result<Value, ToolError>,
    ) -> Self {
        match outcome {
            Ok(payload) => Self::ok(call_id, tool_name, payload),
            Err(e) => Self::failed(call_id, tool_name, &e),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn status(&self) -> ToolStatus {
        self.status
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn metadata(&self) -> &ToolResultMetadata {
        &self.metadata
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Text form of the result as shown to the oracle.
    pub fn observation(&self) -> String {
        match (&self.payload, &self.error_detail) {
            (Some(payload), _) => payload.to_string(),
            (None, Some(detail)) => format!("[{}] {}", self.status, detail),
            (None, None) => String::new(),
        }
    }
}
