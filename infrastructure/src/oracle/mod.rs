//! Oracle adapters
//!
//! The chat-completions wire mapping is always compiled so it can be tested
//! offline; the HTTP client is gated behind the `openai-oracle` feature.

mod openai;

#[cfg(feature = "openai-oracle")]
pub use openai::OpenAiOracle;

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}
