//! Sandbox error types

use agentic_domain::ToolError;
use thiserror::Error;

/// Errors raised while supervising a sandboxed execution.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("capability denied: {0}")]
    Denied(String),

    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("memory limit of {limit_mb} MB exceeded")]
    MemoryLimit { limit_mb: u64 },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while supervising child: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SandboxError> for ToolError {
    fn from(e: SandboxError) -> Self {
        match e {
            SandboxError::Denied(symbol) => ToolError::CapabilityDenied(symbol),
            SandboxError::Timeout { after_ms } => ToolError::Timeout { after_ms },
            SandboxError::MemoryLimit { limit_mb } => ToolError::MemoryLimit { limit_mb },
            other @ (SandboxError::Spawn { .. } | SandboxError::Io(_)) => {
                ToolError::Execution(other.to_string())
            }
        }
    }
}
