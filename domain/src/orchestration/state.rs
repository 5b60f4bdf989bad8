//! Orchestrator state machine
//!
//! ```text
//! AwaitingQuery ─▶ Planning ─▶ Finalizing ─▶ Done
//!                    │  ▲
//!                    ▼  │
//!               ExecutingTool
//!
//! any non-terminal state ─▶ Errored
//! ```

use serde::{Deserialize, Serialize};

use crate::core::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    AwaitingQuery,
    Planning,
    ExecutingTool,
    Finalizing,
    Done,
    Errored,
}

impl OrchestratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorState::AwaitingQuery => "awaiting_query",
            OrchestratorState::Planning => "planning",
            OrchestratorState::ExecutingTool => "executing_tool",
            OrchestratorState::Finalizing => "finalizing",
            OrchestratorState::Done => "done",
            OrchestratorState::Errored => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestratorState::Done | OrchestratorState::Errored)
    }

    pub fn can_transition_to(&self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;

        if next == Errored {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (AwaitingQuery, Planning)
                | (Planning, ExecutingTool)
                | (Planning, Finalizing)
                | (ExecutingTool, Planning)
                | (ExecutingTool, Finalizing)
                | (Finalizing, Done)
        )
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the state and step budget of one query.
///
/// A step is one entry into `ExecutingTool`. Once `max_steps` steps have
/// been taken, [`QueryRun::begin_step`] refuses and the caller must move to
/// `Finalizing` with a best-effort answer.
#[derive(Debug, Clone)]
pub struct QueryRun {
    state: OrchestratorState,
    steps: usize,
    max_steps: usize,
}

impl QueryRun {
    pub fn new(max_steps: usize) -> Self {
        Self {
            state: OrchestratorState::AwaitingQuery,
            steps: 0,
            max_steps,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn step_budget_exhausted(&self) -> bool {
        self.steps >= self.max_steps
    }

    pub fn transition(&mut self, next: OrchestratorState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Enter `ExecutingTool`, consuming one step.
    ///
    /// Returns `Ok(false)` without changing state when the budget is spent.
    pub fn begin_step(&mut self) -> Result<bool, DomainError> {
        if self.step_budget_exhausted() {
            return Ok(false);
        }
        self.transition(OrchestratorState::ExecutingTool)?;
        self.steps += 1;
        Ok(true)
    }

    /// Move to `Errored` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = OrchestratorState::Errored;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OrchestratorState::*;
    use super::*;

    const ALL: [OrchestratorState; 6] =
        [AwaitingQuery, Planning, ExecutingTool, Finalizing, Done, Errored];

    #[test]
    fn test_happy_path_transitions() {
        let mut run = QueryRun::new(3);
        run.transition(Planning).unwrap();
        assert!(run.begin_step().unwrap());
        run.transition(Planning).unwrap();
        run.transition(Finalizing).unwrap();
        run.transition(Done).unwrap();
        assert_eq!(run.state(), Done);
        assert_eq!(run.steps(), 1);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut run = QueryRun::new(1);
        assert!(run.transition(Done).is_err());
        assert!(run.transition(ExecutingTool).is_err());
        assert_eq!(run.state(), AwaitingQuery);
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [Done, Errored] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_any_live_state_can_error() {
        for from in [AwaitingQuery, Planning, ExecutingTool, Finalizing] {
            assert!(from.can_transition_to(Errored));
        }
    }

    #[test]
    fn test_step_budget() {
        let mut run = QueryRun::new(2);
        run.transition(Planning).unwrap();
        assert!(run.begin_step().unwrap());
        run.transition(Planning).unwrap();
        assert!(run.begin_step().unwrap());
        run.transition(Planning).unwrap();
        assert!(!run.begin_step().unwrap());
        assert_eq!(run.state(), Planning);
        assert_eq!(run.steps(), 2);
        assert!(run.step_budget_exhausted());
    }

    #[test]
    fn test_fail_is_idempotent_after_done() {
        let mut run = QueryRun::new(0);
        run.transition(Planning).unwrap();
        run.transition(Finalizing).unwrap();
        run.transition(Done).unwrap();
        run.fail();
        assert_eq!(run.state(), Done);
    }
}
