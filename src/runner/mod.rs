//! Query runners and their registry.
//!
//! A query runner adapts one engine to the host: it executes raw query text,
//! lists the schema, and describes its own configuration form. Runners are
//! registered only when the engine client they need is linked into the build.

mod presto;
pub mod query;
pub mod schema;
pub mod types;

pub use presto::PrestoRunner;
pub use query::{split_statements, strip_metadata_comment};
pub use schema::SchemaEntry;
pub use types::{map_type, Column, ResultSet, TypeTag};

use crate::config::ConnectionConfig;
use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Outcome of a query that reached the engine.
///
/// Engine-reported failures are data for the host, not errors of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    /// Serialized `{columns, rows}` result.
    Data(String),
    /// Message describing why the engine rejected the query.
    Error(String),
}

impl QueryOutput {
    /// Converts to the host's `(data, error)` pair; exactly one side is set.
    pub fn into_pair(self) -> (Option<String>, Option<String>) {
        match self {
            Self::Data(data) => (Some(data), None),
            Self::Error(error) => (None, Some(error)),
        }
    }

    pub fn data(&self) -> Option<&str> {
        match self {
            Self::Data(data) => Some(data),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Data(_) => None,
            Self::Error(error) => Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Interface every query runner implements.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Identifier the host uses to route queries, e.g. `"presto"`.
    fn runner_type() -> &'static str
    where
        Self: Sized;

    /// Whether the runner's engine client is available in this build.
    fn enabled() -> bool
    where
        Self: Sized;

    /// JSON schema of the runner's configuration form.
    fn configuration_schema() -> serde_json::Value
    where
        Self: Sized;

    /// Creates a runner for the given configuration.
    fn from_config(config: ConnectionConfig) -> Result<Self>
    where
        Self: Sized;

    /// Side-effect free query used to check connectivity.
    fn noop_query(&self) -> &'static str;

    /// Executes raw query text.
    ///
    /// Returns `Err(ConnectorError::Cancelled)` after cancelling the engine
    /// query if `cancel` fires while it runs.
    async fn run_query(
        &self,
        query: &str,
        user: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<QueryOutput>;

    /// Lists tables and their columns.
    async fn get_schema(&self) -> Result<Vec<SchemaEntry>>;

    /// Runs the no-op query, failing if the engine reports an error.
    async fn test_connection(&self) -> Result<()> {
        let output = self
            .run_query(self.noop_query(), None, &CancellationToken::new())
            .await?;
        match output {
            QueryOutput::Data(_) => Ok(()),
            QueryOutput::Error(message) => Err(ConnectorError::query(message)),
        }
    }
}

type RunnerFactory = fn(ConnectionConfig) -> Result<Box<dyn QueryRunner>>;

fn build_runner<R: QueryRunner + 'static>(config: ConnectionConfig) -> Result<Box<dyn QueryRunner>> {
    Ok(Box::new(R::from_config(config)?))
}

/// Registration record of an enabled runner.
#[derive(Debug, Clone)]
pub struct RunnerDescriptor {
    pub runner_type: &'static str,
    pub configuration_schema: serde_json::Value,
    factory: RunnerFactory,
}

/// Runners available to the host, keyed by type.
#[derive(Debug, Default)]
pub struct RunnerRegistry {
    runners: BTreeMap<&'static str, RunnerDescriptor>,
}

impl RunnerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every runner this build supports.
    pub fn with_default_runners() -> Self {
        let mut registry = Self::new();
        registry.register::<PrestoRunner>();
        registry
    }

    /// Registers `R` if it is enabled. Returns whether it was registered.
    pub fn register<R: QueryRunner + 'static>(&mut self) -> bool {
        let runner_type = R::runner_type();
        if !R::enabled() {
            debug!("{} query runner is not enabled in this build", runner_type);
            return false;
        }

        info!("Registering {} query runner", runner_type);
        self.runners.insert(
            runner_type,
            RunnerDescriptor {
                runner_type,
                configuration_schema: R::configuration_schema(),
                factory: build_runner::<R>,
            },
        );
        true
    }

    /// Returns true if a runner with the given type is registered.
    pub fn is_registered(&self, runner_type: &str) -> bool {
        self.runners.contains_key(runner_type)
    }

    /// Registered runner types, sorted.
    pub fn types(&self) -> Vec<&'static str> {
        self.runners.keys().copied().collect()
    }

    /// Returns the descriptor of a registered runner.
    pub fn get(&self, runner_type: &str) -> Option<&RunnerDescriptor> {
        self.runners.get(runner_type)
    }

    /// Creates a runner of the given type.
    pub fn create(
        &self,
        runner_type: &str,
        config: ConnectionConfig,
    ) -> Result<Box<dyn QueryRunner>> {
        let descriptor = self.runners.get(runner_type).ok_or_else(|| {
            ConnectorError::config(format!("Unknown query runner type '{runner_type}'"))
        })?;
        (descriptor.factory)(config)
    }
}
