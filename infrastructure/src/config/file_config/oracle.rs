//! Oracle configuration from TOML (`[oracle]` section)

use std::time::Duration;

use agentic_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

use crate::oracle::{DEFAULT_BASE_URL, DEFAULT_MODEL, OracleSettings};

/// Raw oracle configuration from TOML
///
/// # Example
///
/// ```toml
/// [oracle]
/// model = "gpt-4o-mini"
/// timeout_secs = 60
/// api_key_env = "OPENAI_API_KEY"   # name of the variable holding the key
/// base_url = "http://localhost:11434/v1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOracleConfig {
    pub model: String,
    pub timeout_secs: u64,
    pub api_key_env: String,
    pub base_url: String,
}

impl Default for FileOracleConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl FileOracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        if self.timeout_secs == 0 {
            vec![ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "oracle.timeout_secs is 0",
            )]
        } else {
            Vec::new()
        }
    }

    /// Resolve the API key from the configured environment variable.
    pub fn to_settings(&self) -> OracleSettings {
        OracleSettings {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: read_env(&self.api_key_env),
            timeout: self.timeout(),
        }
    }
}

/// Non-empty value of the named variable.
pub(super) fn read_env(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
