//! Scripted engine for testing.
//!
//! Answers statements from a table of canned responses and records what it
//! was asked to do, so connector behavior can be checked without a
//! coordinator.

use super::{ColumnDescription, Cursor, Engine, EngineResult, Row};
use crate::config::ConnectionConfig;
use crate::error::{DatabaseFailure, EngineError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Canned answer for a statement.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Statement succeeds with the given columns and rows.
    Rows {
        columns: Vec<ColumnDescription>,
        rows: Vec<Row>,
    },
    /// Statement fails with a database error.
    Fail(DatabaseFailure),
    /// Statement never finishes until cancelled.
    Hang,
}

impl ScriptedResponse {
    /// Builds a `Rows` response from `(name, type)` pairs.
    pub fn rows(columns: &[(&str, &str)], rows: Vec<Row>) -> Self {
        Self::Rows {
            columns: columns
                .iter()
                .map(|(name, type_name)| ColumnDescription::new(*name, *type_name))
                .collect(),
            rows,
        }
    }

    /// A statement that succeeds without producing columns.
    pub fn empty() -> Self {
        Self::Rows {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// A failure carrying a coordinator-style error object.
    pub fn structured_error(payload: Value) -> Self {
        Self::Fail(DatabaseFailure::Structured(payload))
    }

    /// A failure carrying only text.
    pub fn generic_error(msg: impl Into<String>) -> Self {
        Self::Fail(DatabaseFailure::Generic(msg.into()))
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: Mutex<HashMap<String, ScriptedResponse>>,
    fallback: Mutex<Option<ScriptedResponse>>,
    executed: Mutex<Vec<String>>,
    cancels: AtomicUsize,
    connects: AtomicUsize,
    refuse_connections: Mutex<Option<String>>,
}

/// Engine answering from a script. Clones share the same script and log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    script: Arc<Script>,
}

impl ScriptedEngine {
    /// Creates an engine that echoes `SELECT`s and accepts everything else.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the response for an exact statement text.
    pub fn on(self, sql: impl Into<String>, response: ScriptedResponse) -> Self {
        lock(&self.script.responses).insert(sql.into(), response);
        self
    }

    /// Response for statements without a registered answer.
    pub fn with_fallback(self, response: ScriptedResponse) -> Self {
        *lock(&self.script.fallback) = Some(response);
        self
    }

    /// Makes every `connect` fail with a transport error.
    pub fn refusing_connections(self, reason: impl Into<String>) -> Self {
        *lock(&self.script.refuse_connections) = Some(reason.into());
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.script.executed).clone()
    }

    /// Number of times `cancel` was called on any cursor.
    pub fn cancel_count(&self) -> usize {
        self.script.cancels.load(Ordering::SeqCst)
    }

    /// Number of connections opened.
    pub fn connect_count(&self) -> usize {
        self.script.connects.load(Ordering::SeqCst)
    }

    fn response_for(&self, sql: &str) -> ScriptedResponse {
        if let Some(response) = lock(&self.script.responses).get(sql) {
            return response.clone();
        }
        if let Some(fallback) = lock(&self.script.fallback).as_ref() {
            return fallback.clone();
        }

        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            ScriptedResponse::rows(
                &[("result", "varchar")],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            )
        } else {
            ScriptedResponse::empty()
        }
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn connect(&self, _config: &ConnectionConfig) -> EngineResult<Box<dyn Cursor>> {
        if let Some(reason) = lock(&self.script.refuse_connections).clone() {
            return Err(EngineError::transport(reason));
        }
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedCursor {
            engine: self.clone(),
            current: Mutex::new(None),
        }))
    }
}

struct ScriptedCursor {
    engine: ScriptedEngine,
    current: Mutex<Option<(Vec<ColumnDescription>, Vec<Row>)>>,
}

#[async_trait]
impl Cursor for ScriptedCursor {
    async fn execute(&self, sql: &str) -> EngineResult<()> {
        lock(&self.engine.script.executed).push(sql.to_string());
        *lock(&self.current) = None;

        match self.engine.response_for(sql) {
            ScriptedResponse::Rows { columns, rows } => {
                *lock(&self.current) = Some((columns, rows));
                Ok(())
            }
            ScriptedResponse::Fail(failure) => Err(EngineError::Database(failure)),
            ScriptedResponse::Hang => std::future::pending().await,
        }
    }

    fn description(&self) -> Vec<ColumnDescription> {
        lock(&self.current)
            .as_ref()
            .map(|(columns, _)| columns.clone())
            .unwrap_or_default()
    }

    async fn fetch_all(&self) -> EngineResult<Vec<Row>> {
        let rows = lock(&self.current)
            .as_mut()
            .map(|(_, rows)| std::mem::take(rows))
            .unwrap_or_default();
        Ok(rows)
    }

    async fn cancel(&self) -> EngineResult<()> {
        self.engine.script.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
