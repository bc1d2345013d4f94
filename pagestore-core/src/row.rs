//! Engine-neutral parameters and tabular results.

use std::sync::Arc;

use crate::error::{OperationResult, StoreError};

/// A positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Text(String),
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_owned())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

/// One typed cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

/// One result row. Column names are shared with the rest of its row set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> OperationResult<&Value> {
        self.values
            .get(idx)
            .ok_or_else(|| StoreError::Execution(format!("column {idx} out of range")))
    }

    /// Resolve a column by name (case-insensitive), falling back to `fallback` position
    /// when the backend did not report column names.
    pub fn index_of(&self, name: &str, fallback: usize) -> usize {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .unwrap_or(fallback)
    }

    pub fn int(&self, idx: usize) -> OperationResult<i64> {
        match self.get(idx)? {
            Value::Int(v) => Ok(*v),
            other => Err(unexpected(idx, "integer", other)),
        }
    }

    pub fn text(&self, idx: usize) -> OperationResult<String> {
        match self.get(idx)? {
            Value::Text(v) => Ok(v.clone()),
            other => Err(unexpected(idx, "text", other)),
        }
    }

    /// Text column where NULL reads as an empty string.
    pub fn text_or_empty(&self, idx: usize) -> OperationResult<String> {
        match self.get(idx)? {
            Value::Null => Ok(String::new()),
            _ => self.text(idx),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

fn unexpected(idx: usize, wanted: &str, got: &Value) -> StoreError {
    StoreError::Execution(format!(
        "unexpected column type at {idx}: wanted {wanted}, got {got:?}"
    ))
}

/// Ordered rows returned by a read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let shared: Arc<[String]> = columns.clone().into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&shared), values))
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> impl Iterator<Item = Row> {
        self.rows.into_iter()
    }
}
