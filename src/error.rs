//! Error types for the Presto connector.
//!
//! `ConnectorError` is what callers of the connector see. `EngineError` is
//! produced by engine clients and distinguishes database failures (reported
//! back to the host as soft errors) from transport problems.

use thiserror::Error;

/// Main error type for connector operations.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Engine unreachable, TLS failures, malformed coordinator responses.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors surfaced as hard failures (e.g. connection tests).
    #[error("Query error: {0}")]
    Query(String),

    /// Schema introspection failed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller interrupted the query; the engine-side query was cancelled.
    #[error("Query cancelled")]
    Cancelled,

    /// Internal errors (unexpected states, serialization failures, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConnectorError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a schema error with the given message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Schema(_) => "Schema Error",
            Self::Config(_) => "Configuration Error",
            Self::Cancelled => "Cancelled",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if this error is the result of a caller interrupt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias using ConnectorError.
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Payload of a failure reported by the engine itself.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseFailure {
    /// Structured error object as returned by the coordinator.
    Structured(serde_json::Value),
    /// Anything else; only a display string is available.
    Generic(String),
}

impl DatabaseFailure {
    /// Nested `failureInfo.message`, if the payload carries one.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Structured(payload) => payload
                .get("failureInfo")
                .and_then(|info| info.get("message"))
                .and_then(|message| message.as_str()),
            Self::Generic(_) => None,
        }
    }

    /// Human-readable message handed back to the host.
    pub fn message(&self) -> String {
        match self.failure_message() {
            Some(message) => message.to_string(),
            None => format!("Unspecified DatabaseError: {self}"),
        }
    }
}

impl std::fmt::Display for DatabaseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured(payload) => write!(f, "{payload}"),
            Self::Generic(text) => f.write_str(text),
        }
    }
}

/// Errors produced by engine clients.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine accepted the request but reported a failure.
    #[error("{0}")]
    Database(DatabaseFailure),

    /// The engine could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The engine answered with something that does not follow the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl EngineError {
    /// Creates a database error from a coordinator error payload.
    pub fn structured(payload: serde_json::Value) -> Self {
        Self::Database(DatabaseFailure::Structured(payload))
    }

    /// Creates a database error carrying only text.
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Database(DatabaseFailure::Generic(msg.into()))
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a protocol error with the given message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

impl From<EngineError> for ConnectorError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Database(failure) => Self::Query(failure.message()),
            EngineError::Transport(msg) | EngineError::Protocol(msg) => Self::Connection(msg),
        }
    }
}
