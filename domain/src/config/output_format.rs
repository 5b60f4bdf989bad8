//! Output format value object

use serde::{Deserialize, Serialize};

/// How a query outcome is rendered for the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Only the final answer (default)
    #[default]
    Text,
    /// The answer followed by every tool result
    Full,
    /// The whole outcome as JSON
    Json,
}
