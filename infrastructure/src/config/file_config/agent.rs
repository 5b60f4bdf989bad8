//! Agent configuration from TOML (`[agent]` section)

use agentic_application::OrchestratorConfig;
use agentic_application::config::orchestrator_config::{DEFAULT_HISTORY_LENGTH, DEFAULT_MAX_STEPS};
use agentic_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// max_steps = 8          # tool-execution steps per query
/// history_length = 10    # turns kept per conversation
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub max_steps: usize,
    pub history_length: usize,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            history_length: DEFAULT_HISTORY_LENGTH,
        }
    }
}

impl FileAgentConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.max_steps == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroMaxSteps,
                "agent.max_steps is 0: no tool could ever run",
            ));
        }
        if self.history_length == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroHistoryLength,
                "agent.history_length is 0: conversations could not keep the current query",
            ));
        }
        issues
    }

    /// Orchestrator loop parameters; the oracle timeout comes from `[oracle]`.
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_max_steps(self.max_steps)
            .with_history_length(self.history_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_are_errors() {
        let config = FileAgentConfig {
            max_steps: 0,
            history_length: 0,
        };
        let codes: Vec<ConfigIssueCode> = config.validate().iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![ConfigIssueCode::ZeroMaxSteps, ConfigIssueCode::ZeroHistoryLength]
        );
        assert!(config.validate().iter().all(|i| i.is_error()));
    }

    #[test]
    fn test_to_orchestrator_config() {
        let config = FileAgentConfig {
            max_steps: 3,
            history_length: 4,
        }
        .to_orchestrator_config();
        assert_eq!(config.max_steps, 3);
        assert_eq!(config.history_length, 4);
    }
}
