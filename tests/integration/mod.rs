//! Integration tests for the Presto connector.

pub mod config_test;
pub mod live_test;
pub mod runner_test;
