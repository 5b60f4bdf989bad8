//! Progress reporting while a query runs

pub mod reporter;
