//! **Web Tools** — `web_search`
//!
//! The adapter itself is always compiled; the HTTP backend is gated behind
//! the `web-tools` Cargo feature:
//!
//! ```toml
//! # infrastructure/Cargo.toml
//! [features]
//! web-tools = ["dep:reqwest"]
//!
//! # cli/Cargo.toml (enabled by default for end users)
//! [features]
//! default = ["web-tools", "openai-oracle"]
//! web-tools = ["agentic-infrastructure/web-tools"]
//! ```
//!
//! Without the feature the tool is still registered and answers every call
//! with a provider error, so the oracle sees a consistent tool listing.

mod search;

#[cfg(feature = "web-tools")]
pub use search::SerpApiBackend;
pub use search::{SearchBackend, SearchHit, UnavailableBackend, WebSearchTool};
