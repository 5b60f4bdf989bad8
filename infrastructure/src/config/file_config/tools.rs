//! Tool configuration from TOML (`[tools.*]` sections)

use std::path::PathBuf;
use std::time::Duration;

use agentic_domain::{ConfigIssue, ConfigIssueCode, SandboxPolicy};
use serde::{Deserialize, Serialize};

use super::oracle::read_env;
use crate::tools::settings::{
    CodeSettings, DEFAULT_ALLOWED_MODULES, DEFAULT_DENIED_MODULES, DocumentSettings,
    SERPAPI_ENDPOINT, TabularSettings, ToolSettings, WebSearchSettings,
};

/// Raw tool configuration from TOML
///
/// # Example
///
/// ```toml
/// [tools.web_search]
/// max_results = 5
/// api_key_env = "SERPAPI_API_KEY"
///
/// [tools.tabular]
/// max_rows = 10000
/// strict_row_limit = true
/// root = "./data"
///
/// [tools.code]
/// timeout_secs = 30
/// max_memory_mb = 512
/// allowed = ["pandas", "numpy"]
/// denied = ["os", "subprocess"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    pub web_search: FileWebSearchConfig,
    pub document: FileDocumentConfig,
    pub tabular: FileTabularConfig,
    pub code: FileCodeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWebSearchConfig {
    pub max_results: usize,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the search API key
    pub api_key_env: String,
    pub endpoint: String,
}

impl Default for FileWebSearchConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            timeout_secs: 10,
            api_key_env: "SERPAPI_API_KEY".to_string(),
            endpoint: SERPAPI_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDocumentConfig {
    pub max_pages: usize,
    pub root: Option<PathBuf>,
}

impl Default for FileDocumentConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTabularConfig {
    pub max_rows: usize,
    /// Reject oversized tables instead of truncating them
    pub strict_row_limit: bool,
    pub root: Option<PathBuf>,
}

impl Default for FileTabularConfig {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            strict_row_limit: false,
            root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCodeConfig {
    pub interpreter: String,
    pub timeout_secs: u64,
    pub max_memory_mb: u64,
    pub allowed: Vec<String>,
    pub denied: Vec<String>,
}

impl Default for FileCodeConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs: 30,
            max_memory_mb: 512,
            allowed: DEFAULT_ALLOWED_MODULES.iter().map(|s| s.to_string()).collect(),
            denied: DEFAULT_DENIED_MODULES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileCodeConfig {
    pub fn to_policy(&self) -> SandboxPolicy {
        SandboxPolicy::new(Duration::from_secs(self.timeout_secs), self.max_memory_mb)
            .with_allowed(self.allowed.iter().map(String::as_str))
            .with_denied(self.denied.iter().map(String::as_str))
    }
}

impl FileToolsConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.web_search.timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "tools.web_search.timeout_secs is 0",
            ));
        }
        if self.code.timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "tools.code.timeout_secs is 0",
            ));
        }
        if self.code.max_memory_mb == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroMemoryLimit,
                "tools.code.max_memory_mb is 0",
            ));
        }

        let policy = self.code.to_policy();
        let overlap = policy.overlapping();
        if !overlap.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OverlappingCapabilities,
                format!(
                    "tools.code: {} both allowed and denied; deny wins",
                    overlap.join(", ")
                ),
            ));
        }

        issues
    }

    /// Runtime settings; API keys are read from the named environment
    /// variables here, once.
    pub fn to_settings(&self) -> ToolSettings {
        ToolSettings {
            web_search: WebSearchSettings {
                max_results: self.web_search.max_results,
                timeout: Duration::from_secs(self.web_search.timeout_secs),
                api_key: read_env(&self.web_search.api_key_env),
                endpoint: self.web_search.endpoint.clone(),
            },
            document: DocumentSettings {
                max_pages: self.document.max_pages,
                root: self.document.root.clone(),
            },
            tabular: TabularSettings {
                max_rows: self.tabular.max_rows,
                strict_row_limit: self.tabular.strict_row_limit,
                root: self.tabular.root.clone(),
            },
            code: CodeSettings {
                interpreter: self.code.interpreter.clone(),
                policy: self.code.to_policy(),
            },
        }
    }
}
