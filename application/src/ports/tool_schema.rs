//! Tool schema conversion port.
//!
//! Separates "which tools exist" (domain [`ToolSpec`]s in the registry) from
//! "how an oracle backend wants them described" (infrastructure).

use agentic_domain::ToolSpec;
use serde_json::Value;

/// Port for converting tool specs to an oracle API's function format.
pub trait ToolSchemaPort: Send + Sync {
    /// Convert a single spec.
    fn tool_to_schema(&self, spec: &ToolSpec) -> Value;

    /// Convert a tool listing, keeping its order.
    fn tools_schema(&self, specs: &[ToolSpec]) -> Vec<Value> {
        specs.iter().map(|s| self.tool_to_schema(s)).collect()
    }
}
