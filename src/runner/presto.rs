//! Presto query runner.

use super::query::{split_statements, strip_metadata_comment};
use super::schema::{group_columns, SchemaEntry, SCHEMA_QUERY};
use super::types::{Column, ResultSet};
use super::{QueryOutput, QueryRunner};
use crate::config::{self, ConnectionConfig};
use crate::engine::{self, Cursor, Engine, EngineResult};
use crate::error::{ConnectorError, EngineError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs host queries against a Presto coordinator.
pub struct PrestoRunner {
    config: ConnectionConfig,
    engine: Arc<dyn Engine>,
}

impl PrestoRunner {
    /// Creates a runner that uses the given engine client.
    pub fn with_engine(config: ConnectionConfig, engine: Arc<dyn Engine>) -> Self {
        Self { config, engine }
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Executes a query and returns the result set, or the engine's message
    /// when the engine rejected it.
    pub async fn execute(
        &self,
        query: &str,
        user: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<std::result::Result<ResultSet, String>> {
        info!(
            user = user.unwrap_or("<none>"),
            "run_query: {}",
            query
        );
        let query = strip_metadata_comment(query);

        let cursor = self.engine.connect(&self.config).await?;

        let statements = split_statements(query);
        let Some((last, setup)) = statements.split_last() else {
            warn!("Query has no statements to execute");
            return Ok(Err("Query is empty".to_string()));
        };

        let start = Instant::now();
        let outcome = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                warn!("Query interrupted, cancelling it on the coordinator");
                if let Err(e) = cursor.cancel().await {
                    error!("Failed to cancel query: {}", e);
                }
                return Err(ConnectorError::Cancelled);
            }
            outcome = run_batch(cursor.as_ref(), setup, last) => outcome,
        };

        match outcome {
            Ok(result) => {
                debug!(
                    rows = result.row_count(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Query finished"
                );
                Ok(Ok(result))
            }
            Err(EngineError::Database(failure)) => {
                let message = failure.message();
                warn!("Query failed: {}", message);
                Ok(Err(message))
            }
            Err(other) => Err(other.into()),
        }
    }
}

/// Runs setup statements, discarding their rows, then the final statement.
async fn run_batch(cursor: &dyn Cursor, setup: &[String], last: &str) -> EngineResult<ResultSet> {
    for sql in setup {
        debug!("Executing setup statement: {}", sql);
        cursor.execute(sql).await?;
        cursor.fetch_all().await?;
    }

    debug!("Executing statement: {}", last);
    cursor.execute(last).await?;
    let columns: Vec<Column> = cursor.description().iter().map(Column::from).collect();
    let rows = cursor.fetch_all().await?;

    Ok(ResultSet::from_rows(columns, rows))
}

#[async_trait]
impl QueryRunner for PrestoRunner {
    fn runner_type() -> &'static str {
        "presto"
    }

    fn enabled() -> bool {
        cfg!(feature = "presto")
    }

    fn configuration_schema() -> serde_json::Value {
        config::configuration_schema()
    }

    fn from_config(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let engine = engine::default_engine()
            .ok_or_else(|| ConnectorError::config("Presto client is not available in this build"))?;
        Ok(Self::with_engine(config, engine))
    }

    fn noop_query(&self) -> &'static str {
        "SHOW TABLES"
    }

    async fn run_query(
        &self,
        query: &str,
        user: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<QueryOutput> {
        match self.execute(query, user, cancel).await? {
            Ok(result) => Ok(QueryOutput::Data(result.to_json()?)),
            Err(message) => Ok(QueryOutput::Error(message)),
        }
    }

    async fn get_schema(&self) -> Result<Vec<SchemaEntry>> {
        let result = self
            .execute(SCHEMA_QUERY, None, &CancellationToken::new())
            .await?
            .map_err(|message| {
                error!("Failed getting schema: {}", message);
                ConnectorError::schema("Failed getting schema.")
            })?;

        group_columns(&result.rows)
    }
}
