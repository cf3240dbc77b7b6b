//! Universal column types and the result set handed back to the host.

use crate::engine::{ColumnDescription, Row};
use crate::error::{ConnectorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Column type vocabulary understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Integer,
    Float,
    Boolean,
    String,
    Date,
}

impl TypeTag {
    /// Returns the tag as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static PRESTO_TYPES: LazyLock<HashMap<&'static str, TypeTag>> = LazyLock::new(|| {
    HashMap::from([
        ("integer", TypeTag::Integer),
        ("tinyint", TypeTag::Integer),
        ("smallint", TypeTag::Integer),
        ("long", TypeTag::Integer),
        ("bigint", TypeTag::Integer),
        ("float", TypeTag::Float),
        ("double", TypeTag::Float),
        ("boolean", TypeTag::Boolean),
        ("string", TypeTag::String),
        ("varchar", TypeTag::String),
        ("date", TypeTag::Date),
    ])
});

/// Maps a Presto type name to a universal tag. Unknown names map to `None`.
///
/// Parameterized names such as `varchar(25)` or `decimal(10,2)` are looked up
/// verbatim and therefore come back untyped.
pub fn map_type(type_name: &str) -> Option<TypeTag> {
    PRESTO_TYPES.get(type_name).copied()
}

/// A result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: Option<TypeTag>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_tag: Option<TypeTag>) -> Self {
        Self {
            name: name.into(),
            type_tag,
        }
    }
}

impl From<&ColumnDescription> for Column {
    fn from(description: &ColumnDescription) -> Self {
        Self::new(&description.name, map_type(&description.type_name))
    }
}

/// Columns plus rows keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Map<String, Value>>,
}

impl ResultSet {
    /// Zips positional engine rows with the column names.
    ///
    /// Rows are maps, so a name that appears twice keeps its first position
    /// and the value of its last occurrence.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| column.name.clone())
                    .zip(row)
                    .collect::<Map<String, Value>>()
            })
            .collect();

        Self { columns, rows }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Serializes to the host's JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ConnectorError::internal(format!("Failed to serialize result: {e}")))
    }
}
