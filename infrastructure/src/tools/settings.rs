//! Runtime settings for the built-in tools.
//!
//! Built once from the file configuration and never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

use agentic_domain::{SandboxPolicy, ToolKind};

pub const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search";

/// Capability symbol used by web search and document downloads
pub const NETWORK: &str = "network";
/// Capability symbol used by the document and table adapters
pub const FILESYSTEM_READ: &str = "filesystem.read";

/// Payload ceiling for adapters that run in-process
const IN_PROCESS_MEMORY_MB: u64 = 64;
/// Wall-clock limit for the local file adapters
const FILE_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default module allow-list for executed code
pub const DEFAULT_ALLOWED_MODULES: &[&str] = &[
    "pandas",
    "numpy",
    "matplotlib",
    "seaborn",
    "sklearn",
    "datetime",
    "json",
    "re",
    "math",
    "collections",
    "random",
    "itertools",
    "functools",
    "statistics",
];

/// Default module deny-list for executed code, plus the dynamic-evaluation
/// builtins
pub const DEFAULT_DENIED_MODULES: &[&str] = &[
    "os",
    "sys",
    "subprocess",
    "socket",
    "requests",
    "urllib",
    "http",
    "ftplib",
    "telnetlib",
    "smtplib",
    "ssl",
    "pathlib",
    "shutil",
    "tempfile",
    "io",
    "pickle",
    "importlib",
    "builtins",
    "eval",
    "exec",
    "__import__",
];

#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchSettings {
    pub max_results: usize,
    pub timeout: Duration,
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            timeout: Duration::from_secs(10),
            api_key: None,
            endpoint: SERPAPI_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSettings {
    pub max_pages: usize,
    /// Relative paths resolve against this directory; absolute paths must
    /// stay inside it
    pub root: Option<PathBuf>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            max_pages: 50,
            root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabularSettings {
    pub max_rows: usize,
    pub strict_row_limit: bool,
    pub root: Option<PathBuf>,
}

impl Default for TabularSettings {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            strict_row_limit: false,
            root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeSettings {
    pub interpreter: String,
    pub policy: SandboxPolicy,
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            policy: SandboxPolicy::new(Duration::from_secs(30), 512)
                .with_allowed(DEFAULT_ALLOWED_MODULES.iter().copied())
                .with_denied(DEFAULT_DENIED_MODULES.iter().copied()),
        }
    }
}

/// Settings for all built-in tools.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSettings {
    pub web_search: WebSearchSettings,
    pub document: DocumentSettings,
    pub tabular: TabularSettings,
    pub code: CodeSettings,
}

impl ToolSettings {
    /// Sandbox policy applied to the given tool family.
    pub fn policy_for(&self, kind: ToolKind) -> SandboxPolicy {
        match kind {
            ToolKind::WebSearch => SandboxPolicy::new(self.web_search.timeout, IN_PROCESS_MEMORY_MB)
                .with_allowed([NETWORK]),
            ToolKind::DocumentExtraction => SandboxPolicy::new(FILE_TOOL_TIMEOUT, IN_PROCESS_MEMORY_MB)
                .with_allowed(["filesystem", NETWORK]),
            ToolKind::TabularAnalysis => SandboxPolicy::new(FILE_TOOL_TIMEOUT, IN_PROCESS_MEMORY_MB)
                .with_allowed(["filesystem"]),
            ToolKind::CodeExecution => self.code.policy.clone(),
        }
    }
}
