//! Application-level configuration.
//!
//! - [`OrchestratorConfig`]: query loop control (step budget, history length,
//!   oracle timeout)

pub mod orchestrator_config;

pub use orchestrator_config::OrchestratorConfig;
