//! Progress notification port
//!
//! Defines the interface for reporting progress while a query is being
//! orchestrated.

use agentic_domain::{ToolCall, ToolResult};

/// Callback for progress updates during orchestration
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (spinner, plain lines, nothing).
pub trait ProgressNotifier: Send + Sync {
    /// Called before each oracle invocation
    fn on_planning(&self, _step: usize) {}

    /// Called when a tool call is dispatched
    fn on_tool_start(&self, _call: &ToolCall) {}

    /// Called when a tool call finishes, whatever its status
    fn on_tool_complete(&self, _result: &ToolResult) {}

    /// Called when the step budget is exhausted
    fn on_step_limit(&self, _max_steps: usize) {}

    /// Called with the final answer
    fn on_answer(&self, _answer: &str) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {}
