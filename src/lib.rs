//! Presto query runner for BI dashboards.
//!
//! Executes host query text against a Presto coordinator and returns results
//! as `{columns, rows}` JSON with columns mapped to a small set of universal
//! types.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod runner;
