//! Port definitions (interfaces for external adapters)
//!
//! Ports define how the application layer interacts with external systems.
//! Implementations (adapters) are provided by the infrastructure layer.

pub mod conversation_logger;
pub mod conversation_memory;
pub mod oracle;
pub mod progress;
pub mod tool_executor;
pub mod tool_schema;
