//! Tool domain module
//!
//! Defines how the orchestrator describes and invokes tools.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolRegistry │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (ToolSpecs)  │    │ (invocation) │    │ (outcome)    │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! Every [`ToolSpec`] is backed by one variant of the closed [`ToolKind`]
//! set. Calls are checked by a [`ToolValidator`] before dispatch, and every
//! dispatched call yields a [`ToolResult`] with the same call id.
//!
//! | Kind | Registered as | Side effect |
//! |------|---------------|-------------|
//! | `WebSearch` | `web_search` | read-only |
//! | `DocumentExtraction` | `pdf_parser` | read-only |
//! | `TabularAnalysis` | `data_analysis` | read-only |
//! | `CodeExecution` | `code_execute` | mutating |

pub mod entities;
pub mod registry;
pub mod traits;
pub mod value_objects;

pub use entities::{
    Arguments, CallId, ParamType, SideEffect, ToolCall, ToolKind, ToolParameter, ToolSpec, names,
};
pub use registry::{RegistryError, ToolRegistry};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{MEMORY_LIMIT_EXCEEDED, ToolError, ToolResult, ToolResultMetadata, ToolStatus};
