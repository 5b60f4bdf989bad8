//! Use cases (application services)
//!
//! Use cases orchestrate domain logic and coordinate with external systems
//! through ports.

pub mod run_query;
pub(crate) mod shared;
pub mod tool_helpers;
