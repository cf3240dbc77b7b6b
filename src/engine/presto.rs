//! Presto engine client.
//!
//! Speaks the Presto client REST protocol: a statement is `POST`ed to
//! `/v1/statement` and the coordinator's `nextUri` links are followed until
//! the query finishes. A `DELETE` on the current `nextUri` cancels it.

use super::{ColumnDescription, Cursor, Engine, EngineResult, Row};
use crate::config::ConnectionConfig;
use crate::error::EngineError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Value sent in `X-Presto-Source`.
const SOURCE: &str = "presto-connector";

/// Timeout for establishing the TCP/TLS connection.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeout for a single protocol request; queries themselves may run longer.
const REQUEST_TIMEOUT_SECS: u64 = 300;

const HEADER_USER: &str = "X-Presto-User";
const HEADER_CATALOG: &str = "X-Presto-Catalog";
const HEADER_SCHEMA: &str = "X-Presto-Schema";
const HEADER_SOURCE: &str = "X-Presto-Source";
const HEADER_SESSION: &str = "X-Presto-Session";
const HEADER_SET_SESSION: &str = "X-Presto-Set-Session";
const HEADER_CLEAR_SESSION: &str = "X-Presto-Clear-Session";

/// Engine that opens HTTP connections to a Presto coordinator.
#[derive(Debug, Clone)]
pub struct PrestoEngine {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl PrestoEngine {
    /// Creates an engine with the default timeouts.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for PrestoEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for PrestoEngine {
    async fn connect(&self, config: &ConnectionConfig) -> EngineResult<Box<dyn Cursor>> {
        let cursor = PrestoCursor::open(config, self.connect_timeout, self.request_timeout)?;
        Ok(Box::new(cursor))
    }
}

/// Cursor over a single Presto connection.
///
/// Each cursor owns its own HTTP client, so connections are never shared
/// between calls.
#[derive(Debug)]
pub struct PrestoCursor {
    client: Client,
    base_url: String,
    config: ConnectionConfig,
    state: Mutex<CursorState>,
}

impl PrestoCursor {
    /// Opens a cursor for the given configuration.
    pub fn open(
        config: &ConnectionConfig,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> EngineResult<Self> {
        let base_url = config
            .base_url()
            .map_err(|e| EngineError::transport(e.to_string()))?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::transport(format!("Failed to create HTTP client: {e}")))?;

        debug!("Opened Presto connection to {}", config.display_string());

        Ok(Self {
            client,
            base_url,
            config: config.clone(),
            state: Mutex::new(CursorState::default()),
        })
    }

    /// Returns the statement endpoint URL.
    fn statement_url(&self) -> String {
        format!("{}/v1/statement", self.base_url)
    }

    /// Id the coordinator assigned to the current statement.
    pub fn query_id(&self) -> Option<String> {
        self.state().query_id.clone()
    }

    fn state(&self) -> MutexGuard<'_, CursorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let session = self.state().session_header();

        let mut request = request
            .header(HEADER_USER, &self.config.username)
            .header(HEADER_CATALOG, &self.config.catalog)
            .header(HEADER_SCHEMA, &self.config.schema)
            .header(HEADER_SOURCE, SOURCE);

        if let Some(session) = session {
            request = request.header(HEADER_SESSION, session);
        }
        if let Some(password) = self.config.password() {
            request = request.basic_auth(&self.config.username, Some(password));
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> EngineResult<()> {
        let response = request.send().await.map_err(map_request_error)?;
        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> EngineResult<()> {
        let status = response.status();
        let session = SessionUpdates::from_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            self.state().next_uri = None;
            return Err(EngineError::generic(format!(
                "Unexpected status code {status}\n{body}"
            )));
        }

        let results: QueryResults = serde_json::from_str(&body).map_err(|e| {
            self.state().next_uri = None;
            EngineError::protocol(format!("Failed to parse coordinator response: {e}"))
        })?;

        self.state().apply(results, session)
    }

    /// Follows `nextUri` once. No-op when the statement has finished.
    async fn advance(&self) -> EngineResult<()> {
        let next_uri = self.state().next_uri.clone();
        let Some(uri) = next_uri else {
            return Ok(());
        };
        self.send(self.with_headers(self.client.get(uri))).await
    }

    fn awaiting_columns(&self) -> bool {
        let state = self.state();
        state.columns.is_none() && state.next_uri.is_some()
    }

    fn has_next(&self) -> bool {
        self.state().next_uri.is_some()
    }
}

#[async_trait]
impl Cursor for PrestoCursor {
    async fn execute(&self, sql: &str) -> EngineResult<()> {
        self.state().reset();
        debug!("Submitting statement to {}", self.statement_url());

        let request = self
            .with_headers(self.client.post(self.statement_url()))
            .body(sql.to_string());
        self.send(request).await?;

        while self.awaiting_columns() {
            self.advance().await?;
        }
        Ok(())
    }

    fn description(&self) -> Vec<ColumnDescription> {
        self.state().columns.clone().unwrap_or_default()
    }

    async fn fetch_all(&self) -> EngineResult<Vec<Row>> {
        while self.has_next() {
            self.advance().await?;
        }
        Ok(std::mem::take(&mut self.state().rows))
    }

    async fn cancel(&self) -> EngineResult<()> {
        let (next_uri, query_id) = {
            let mut state = self.state();
            (state.next_uri.take(), state.query_id.clone())
        };
        let Some(uri) = next_uri else {
            return Ok(());
        };

        info!(
            "Cancelling Presto query {}",
            query_id.as_deref().unwrap_or("<unknown>")
        );
        self.with_headers(self.client.delete(uri))
            .send()
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}

fn map_request_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::transport(format!("Request to Presto timed out: {e}"))
    } else if e.is_connect() {
        EngineError::transport(format!("Failed to connect to Presto: {e}"))
    } else {
        EngineError::transport(format!("Request failed: {e}"))
    }
}

/// Protocol state of the current statement plus connection-level session.
#[derive(Debug, Default)]
struct CursorState {
    query_id: Option<String>,
    next_uri: Option<String>,
    columns: Option<Vec<ColumnDescription>>,
    rows: Vec<Row>,
    session: BTreeMap<String, String>,
}

impl CursorState {
    /// Clears per-statement state. Session properties survive.
    fn reset(&mut self) {
        self.query_id = None;
        self.next_uri = None;
        self.columns = None;
        self.rows.clear();
    }

    fn apply(&mut self, results: QueryResults, session: SessionUpdates) -> EngineResult<()> {
        for (name, value) in session.set {
            self.session.insert(name, value);
        }
        for name in session.clear {
            self.session.remove(&name);
        }

        if results.id.is_some() {
            self.query_id = results.id;
        }

        if let Some(error) = results.error {
            self.next_uri = None;
            return Err(EngineError::structured(error));
        }

        self.next_uri = results.next_uri;
        if let Some(columns) = results.columns {
            self.columns = Some(
                columns
                    .into_iter()
                    .map(|c| ColumnDescription::new(c.name, c.type_name))
                    .collect(),
            );
        }
        if let Some(data) = results.data {
            self.rows.extend(data);
        }
        Ok(())
    }

    /// Value of the `X-Presto-Session` request header.
    fn session_header(&self) -> Option<String> {
        if self.session.is_empty() {
            return None;
        }
        Some(
            self.session
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

/// Session changes announced by the coordinator in response headers.
#[derive(Debug, Default, PartialEq)]
struct SessionUpdates {
    set: Vec<(String, String)>,
    clear: Vec<String>,
}

impl SessionUpdates {
    fn from_headers(headers: &HeaderMap) -> Self {
        let set = headers
            .get_all(HEADER_SET_SESSION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split_once('='))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        let clear = headers
            .get_all(HEADER_CLEAR_SESSION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(|name| name.trim().to_string())
            .collect();

        Self { set, clear }
    }
}

// Presto protocol types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    id: Option<String>,
    next_uri: Option<String>,
    columns: Option<Vec<PrestoColumn>>,
    data: Option<Vec<Row>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PrestoColumn {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}
