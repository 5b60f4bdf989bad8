//! Orchestration domain module
//!
//! - [`state`]: the per-query state machine and step budget
//! - [`decision`]: the oracle's answer to one planning step

pub mod decision;
pub mod state;

pub use decision::{OracleDecision, RequestedCall};
pub use state::{OrchestratorState, QueryRun};
