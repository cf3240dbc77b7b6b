//! Schema listing built from `information_schema.columns`.

use crate::error::{ConnectorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Columns of every user table, one row per column.
pub const SCHEMA_QUERY: &str = r#"
SELECT table_schema, table_name, column_name
FROM information_schema.columns
WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
"#;

/// Schemas that never show up in the listing.
pub const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema"];

/// A table and its column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// `schema.table`
    pub name: String,
    pub columns: Vec<String>,
}

/// Groups introspection rows by `schema.table`.
///
/// Tables appear in the order they are first seen; columns in the order the
/// rows arrive.
pub fn group_columns(rows: &[Map<String, Value>]) -> Result<Vec<SchemaEntry>> {
    let mut entries: Vec<SchemaEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let table_schema = field(row, "table_schema")?;
        if SYSTEM_SCHEMAS.contains(&table_schema) {
            continue;
        }
        let table_name = format!("{}.{}", table_schema, field(row, "table_name")?);
        let column_name = field(row, "column_name")?.to_string();

        let position = *positions.entry(table_name.clone()).or_insert_with(|| {
            entries.push(SchemaEntry {
                name: table_name,
                columns: Vec::new(),
            });
            entries.len() - 1
        });
        entries[position].columns.push(column_name);
    }

    Ok(entries)
}

fn field<'a>(row: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    row.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectorError::schema(format!("Schema row is missing '{name}'")))
}
