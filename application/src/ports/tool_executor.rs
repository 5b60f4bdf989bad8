//! Tool Executor port
//!
//! Defines the interface for executing validated tool calls under their
//! sandbox policies.

use agentic_domain::{ToolCall, ToolRegistry, ToolResult, ToolSpec};
use async_trait::async_trait;

/// Port for tool execution
///
/// Implementations (adapters) live in the infrastructure layer. They must
/// return exactly one [`ToolResult`] carrying `call.call_id`, and must fold
/// every failure (including panics inside a capability) into that result.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// The read-only registry of available tools
    fn registry(&self) -> &ToolRegistry;

    /// Execute a call whose arguments were already validated against `spec`
    async fn execute(&self, spec: &ToolSpec, call: &ToolCall) -> ToolResult;
}
