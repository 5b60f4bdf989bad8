//! Configuration file loader with multi-source merging

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use thiserror::Error;

use super::file_config::FileConfig;

const APP_DIR: &str = "agentic";
const PROJECT_FILES: [&str; 2] = ["agentic.toml", ".agentic.toml"];
const ENV_PREFIX: &str = "AGENTIC_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment: `AGENTIC_AGENT__MAX_STEPS=4` style variables
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./agentic.toml` or `./.agentic.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/agentic/config.toml`
    /// 5. Default values
    ///
    /// CLI flags are applied by the caller on top of the result.
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        let project = Self::project_config_path();
        Self::load_from(Self::global_config_path(), project, config_path)
    }

    fn load_from(
        global: Option<PathBuf>,
        project: Option<PathBuf>,
        explicit: Option<&Path>,
    ) -> Result<FileConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(project_path) = project {
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/agentic/config.toml if set,
    /// otherwise falls back to ~/.config/agentic/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Describe the config file locations being used
    pub fn config_sources() -> Vec<String> {
        let mut lines = vec!["Configuration sources (in priority order):".to_string()];

        lines.push(format!("  [ENV  ] {ENV_PREFIX}* variables"));

        match Self::project_config_path() {
            Some(path) => lines.push(format!("  [FOUND] Project: {}", path.display())),
            None => lines.push("  [     ] Project: ./agentic.toml or ./.agentic.toml".to_string()),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            lines.push(format!("  [{mark}] Global:  {}", path.display()));
        }

        lines.push("  [     ] Default: built-in defaults".to_string());
        lines
    }
}
