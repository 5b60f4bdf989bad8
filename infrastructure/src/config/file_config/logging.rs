//! Logging configuration from TOML (`[logging]` section)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw logging configuration from TOML
///
/// ```toml
/// [logging]
/// conversation_log = "~/.local/share/agentic/conversations.jsonl"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of every query; disabled when unset
    pub conversation_log: Option<PathBuf>,
}

impl FileLoggingConfig {
    /// Transcript path with a leading `~/` expanded.
    pub fn conversation_log_path(&self) -> Option<PathBuf> {
        let path = self.conversation_log.as_ref()?;
        match path.strip_prefix("~") {
            Ok(rest) => dirs::home_dir().map(|home| home.join(rest)),
            Err(_) => Some(path.clone()),
        }
    }
}
