//! Orchestrator parameters: query loop control.
//!
//! [`OrchestratorConfig`] groups the static parameters that control the
//! loop in [`RunQueryUseCase`](crate::use_cases::run_query::RunQueryUseCase).
//! Built once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_STEPS: usize = 8;
pub const DEFAULT_HISTORY_LENGTH: usize = 10;
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum tool-execution steps per query.
    pub max_steps: usize,
    /// Number of turns each conversation keeps visible.
    pub history_length: usize,
    /// Hard limit on a single oracle call.
    pub oracle_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            history_length: DEFAULT_HISTORY_LENGTH,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_history_length(mut self, len: usize) -> Self {
        self.history_length = len;
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }
}
