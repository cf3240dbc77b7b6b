//! Engine client abstraction.
//!
//! The connector talks to the query engine through the `Engine` and `Cursor`
//! traits so the Presto HTTP client can be swapped for the scripted engine
//! in tests and offline runs.

mod mock;
#[cfg(feature = "presto")]
mod presto;

pub use mock::{ScriptedEngine, ScriptedResponse};
#[cfg(feature = "presto")]
pub use presto::{PrestoCursor, PrestoEngine};

use crate::config::ConnectionConfig;
use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// A single result row as reported by the engine.
pub type Row = Vec<serde_json::Value>;

/// Column metadata reported by the engine for the current statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    /// Column name.
    pub name: String,

    /// Engine-native type name, e.g. `bigint` or `varchar(25)`.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ColumnDescription {
    /// Creates a new column description.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Opens connections to a query engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Opens a connection and returns a cursor bound to it.
    ///
    /// The connection lives as long as the cursor.
    async fn connect(&self, config: &ConnectionConfig) -> EngineResult<Box<dyn Cursor>>;
}

/// A statement cursor on an open engine connection.
///
/// Statements run strictly one after another. All methods take `&self` so a
/// caller can race `execute`/`fetch_all` against an interrupt and still reach
/// `cancel` on the same cursor.
#[async_trait]
pub trait Cursor: Send + Sync {
    /// Submits a statement. Returns once column metadata is known or the
    /// statement has finished.
    async fn execute(&self, sql: &str) -> EngineResult<()>;

    /// Column metadata of the most recently executed statement.
    fn description(&self) -> Vec<ColumnDescription>;

    /// Drains all remaining rows of the current statement.
    async fn fetch_all(&self) -> EngineResult<Vec<Row>>;

    /// Cancels the in-flight statement on the engine side. Idempotent.
    async fn cancel(&self) -> EngineResult<()>;
}

/// Returns the engine linked into this build, if any.
pub fn default_engine() -> Option<Arc<dyn Engine>> {
    #[cfg(feature = "presto")]
    {
        Some(Arc::new(PrestoEngine::new()))
    }
    #[cfg(not(feature = "presto"))]
    {
        None
    }
}
