//! Oracle port
//!
//! The oracle is the decision-making collaborator (backed by a language
//! model in production) that looks at the visible history and the tool
//! listing and either answers or requests tool calls.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use agentic_domain::{OracleDecision, ToolSpec, Turn};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while asking the oracle for a decision
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle timed out")]
    Timeout,

    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Decide the next action given the visible history (oldest first) and
    /// the registered tools in registration order.
    async fn decide(
        &self,
        history: &[Turn],
        tools: &[ToolSpec],
    ) -> Result<OracleDecision, OracleError>;
}

/// Oracle that replays a fixed sequence of decisions.
///
/// Each call to [`Oracle::decide`] pops the next scripted entry; once the
/// script is exhausted it reports [`OracleError::Unavailable`]. Every call
/// records the history it was shown so tests can inspect what the
/// orchestrator passed in.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<OracleDecision, OracleError>>>,
    seen: Mutex<Vec<Vec<Turn>>>,
    delay: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new(decisions: impl IntoIterator<Item = OracleDecision>) -> Self {
        Self::from_results(decisions.into_iter().map(Ok))
    }

    pub fn from_results(
        results: impl IntoIterator<Item = Result<OracleDecision, OracleError>>,
    ) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Histories passed to each `decide` call, in call order.
    pub fn seen_histories(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn decide(
        &self,
        history: &[Turn],
        _tools: &[ToolSpec],
    ) -> Result<OracleDecision, OracleError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(history.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .map_err(|_| OracleError::Unavailable("script lock poisoned".to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Unavailable("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_oracle_replays_in_order() {
        let oracle = ScriptedOracle::new([
            OracleDecision::answer("one"),
            OracleDecision::answer("two"),
        ]);
        let history = vec![Turn::user("hi")];

        assert_eq!(
            oracle.decide(&history, &[]).await.unwrap(),
            OracleDecision::answer("one")
        );
        assert_eq!(
            oracle.decide(&history, &[]).await.unwrap(),
            OracleDecision::answer("two")
        );
        assert!(matches!(
            oracle.decide(&history, &[]).await,
            Err(OracleError::Unavailable(_))
        ));
        assert_eq!(oracle.calls(), 3);
        assert_eq!(oracle.seen_histories()[0][0].content, "hi");
    }
}
