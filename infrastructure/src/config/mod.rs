//! Configuration file loading for agentic
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `AGENTIC_*` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./agentic.toml` or `./.agentic.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/agentic/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileAgentConfig, FileCodeConfig, FileConfig, FileDocumentConfig, FileLoggingConfig,
    FileOracleConfig, FileOutputConfig, FileTabularConfig, FileToolsConfig, FileWebSearchConfig,
};
pub use loader::{ConfigError, ConfigLoader};
