// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

//! Contract between the polling source and an external store driver.
//!
//! A [Driver] opens [Connection]s. A connection executes a query string and
//! hands every resulting [Row] to a visitor in cursor order.

#[cfg(feature = "sqlite")]
pub mod sqlite;

use snafu::Snafu;
use std::{fmt, ops::ControlFlow, sync::Arc};

/// Result type returned by store drivers
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a store driver
#[derive(Debug, Snafu)]
pub enum StoreError {
    /// The store could not be reached.
    #[snafu(display("Store unreachable {}", msg))]
    Unreachable { msg: String },
    /// The store refused the connection, e.g., invalid credentials.
    #[snafu(display("Store rejected connection {}", msg))]
    Rejected { msg: String },
    /// Query preparation, execution or row iteration failed.
    #[snafu(display("Query failed {}", msg))]
    Query { msg: String },
    /// The connection was used after it had been closed.
    #[snafu(display("Connection already closed"))]
    Closed,
}

/// User credentials handed to [Driver::open]
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }
}

// Keep passwords out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Creates connections to one kind of store
pub trait Driver: Send + 'static {
    /// Connection type produced by this driver
    type Connection: Connection;

    /// Identifier that the `driver` configuration option must match
    fn identifier(&self) -> &str;

    /// Open a connection to the store located at `url`
    fn open(&self, url: &str, credentials: &Credentials) -> StoreResult<Self::Connection>;
}

/// An open handle to an external store
pub trait Connection: Send + 'static {
    /// Execute `query` and pass each row, in cursor order, to `visit`.
    ///
    /// Iteration stops early once `visit` returns [ControlFlow::Break].
    /// Blocks until the cursor is exhausted, stopped or has failed.
    fn execute(
        &mut self,
        query: &str,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> StoreResult<()>;

    /// Release the handle
    fn close(self) -> StoreResult<()>;
}

/// A single column value of a [Row]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Name of the value kind, used in conversion error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Error returned by the typed [Row] getters
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    /// No column with the given name or index
    MissingColumn(String),
    /// The column holds a value of another kind
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RowError::MissingColumn(c) => write!(f, "no such column {}", c),
            RowError::TypeMismatch {
                column,
                expected,
                found,
            } => write!(f, "column {} holds {} but {} was expected", column, found, expected),
        }
    }
}

impl std::error::Error for RowError {}

/// One row returned by a store, owned by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row. `columns` is shared by all rows of one result set.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value at column `idx`
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of the column called `name`
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, RowError> {
        match self.lookup(name)? {
            Value::Integer(v) => Ok(*v),
            other => Err(self.mismatch(name, "integer", other)),
        }
    }

    /// Integers are widened to f64
    pub fn get_f64(&self, name: &str) -> Result<f64, RowError> {
        match self.lookup(name)? {
            Value::Real(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            other => Err(self.mismatch(name, "real", other)),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str, RowError> {
        match self.lookup(name)? {
            Value::Text(v) => Ok(v),
            other => Err(self.mismatch(name, "text", other)),
        }
    }

    pub fn get_bytes(&self, name: &str) -> Result<&[u8], RowError> {
        match self.lookup(name)? {
            Value::Blob(v) => Ok(v),
            other => Err(self.mismatch(name, "blob", other)),
        }
    }

    /// `None` for SQL NULL, otherwise the text value
    pub fn get_opt_str(&self, name: &str) -> Result<Option<&str>, RowError> {
        match self.lookup(name)? {
            Value::Null => Ok(None),
            Value::Text(v) => Ok(Some(v)),
            other => Err(self.mismatch(name, "text", other)),
        }
    }

    fn lookup(&self, name: &str) -> Result<&Value, RowError> {
        self.get_by_name(name)
            .ok_or_else(|| RowError::MissingColumn(name.to_string()))
    }

    fn mismatch(&self, name: &str, expected: &'static str, found: &Value) -> RowError {
        RowError::TypeMismatch {
            column: name.to_string(),
            expected,
            found: found.kind(),
        }
    }
}
