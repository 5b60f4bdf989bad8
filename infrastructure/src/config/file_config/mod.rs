//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod agent;
mod logging;
mod oracle;
mod output;
mod tools;

pub use agent::FileAgentConfig;
pub use logging::FileLoggingConfig;
pub use oracle::FileOracleConfig;
pub use output::FileOutputConfig;
pub use tools::{
    FileCodeConfig, FileDocumentConfig, FileTabularConfig, FileToolsConfig, FileWebSearchConfig,
};

use agentic_application::OrchestratorConfig;
use agentic_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

use crate::oracle::OracleSettings;
use crate::tools::ToolSettings;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Query loop settings
    pub agent: FileAgentConfig,
    /// Chat-completions endpoint
    pub oracle: FileOracleConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Built-in tool settings
    pub tools: FileToolsConfig,
    /// Transcript settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Zero limits are errors; an allow/deny overlap in the code policy is
    /// a warning since deny wins anyway.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.agent.validate());
        issues.extend(self.oracle.validate());
        issues.extend(self.tools.validate());
        issues
    }

    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        self.agent
            .to_orchestrator_config()
            .with_oracle_timeout(self.oracle.timeout())
    }

    pub fn to_tool_settings(&self) -> ToolSettings {
        self.tools.to_settings()
    }

    pub fn to_oracle_settings(&self) -> OracleSettings {
        self.oracle.to_settings()
    }
}
