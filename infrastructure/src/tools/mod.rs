//! Built-in tools
//!
//! Four tool families, each behind one adapter and registered in a fixed
//! order:
//!
//! | Tool | Adapter | Sandbox path |
//! |------|---------|--------------|
//! | `web_search` | [`WebSearchTool`] | in-process, capability `network` |
//! | `pdf_parser` | [`DocumentTool`] | in-process, capability `filesystem.read` or `network` |
//! | `data_analysis` | [`TabularTool`] | in-process, capability `filesystem.read` |
//! | `code_execute` | [`CodeTool`] | isolated child process |
//!
//! [`SandboxedToolExecutor`] owns the registry and dispatches validated
//! calls to the adapters.

pub mod code;
pub mod document;
pub mod paths;
pub mod schema;
pub mod settings;
pub mod tabular;
pub mod web;

mod executor;

pub use code::CodeTool;
pub use document::{
    Document, DocumentPage, DocumentSource, DocumentTool, LocalDocumentSource,
    UnavailableDocumentSource, decode_document,
};
#[cfg(feature = "web-tools")]
pub use document::HttpDocumentSource;
pub use executor::{SandboxedToolExecutor, ToolAdapter, ToolSetupError, builtin_adapters};
pub use schema::JsonSchemaToolConverter;
pub use settings::{CodeSettings, DocumentSettings, TabularSettings, ToolSettings, WebSearchSettings};
pub use tabular::TabularTool;
pub use web::{SearchBackend, SearchHit, WebSearchTool};

use agentic_domain::ToolRegistry;

/// The registry of built-in tool specs, in registration order.
pub fn builtin_registry(settings: &ToolSettings) -> Result<ToolRegistry, ToolSetupError> {
    let mut registry = ToolRegistry::new();
    for adapter in builtin_adapters(settings)? {
        registry.register(adapter.spec())?;
    }
    Ok(registry)
}
