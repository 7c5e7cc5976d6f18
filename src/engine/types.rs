//! Universal data types for the federation engine
//!
//! These types provide a normalized representation of query results
//! independent of the backend driver that produced them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a submitted query, attached to tracing spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(pub Uuid);

impl QueryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Universal value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// A single row of data (indexed by column order)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

/// Query execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column information
    pub columns: Vec<ColumnInfo>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Execution time in milliseconds
    pub execution_time_ms: f64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms: 0.0,
        }
    }
}

/// Case-insensitive, name-keyed view over a positional `QueryResult`.
///
/// The discovery and tile queries alias their columns in lower case, but
/// backends are free to report any casing; lookups lowercase both sides.
pub struct RecordView<'a> {
    ordinals: HashMap<String, usize>,
    result: &'a QueryResult,
}

impl<'a> RecordView<'a> {
    pub fn new(result: &'a QueryResult) -> Self {
        let ordinals = result
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| (col.name.to_lowercase(), idx))
            .collect();
        Self { ordinals, result }
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Row> {
        self.result.rows.iter()
    }

    /// Returns the value for `column` in `row`, or None if the column is
    /// absent from the result set.
    pub fn get<'r>(&self, row: &'r Row, column: &str) -> Option<&'r Value> {
        let idx = *self.ordinals.get(&column.to_lowercase())?;
        row.values.get(idx)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.ordinals.contains_key(&column.to_lowercase())
    }
}
