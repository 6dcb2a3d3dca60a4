// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use super::{Connection, Credentials, Driver, Row, StoreError, StoreResult, Value};
use rusqlite::{types::ValueRef, OpenFlags};
use std::{ops::ControlFlow, sync::Arc};

/// Identifier to use for the `driver` option
pub const SQLITE_DRIVER: &str = "sqlite";

const URL_PREFIXES: [&str; 2] = ["jdbc:sqlite:", "sqlite:"];
const IN_MEMORY: &str = ":memory:";

/// Driver for SQLite database files
///
/// Accepted urls are `sqlite:<path>`, `jdbc:sqlite:<path>` and `sqlite::memory:`.
/// Database files are opened read-only and must already exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        SqliteDriver
    }
}

fn database_path(url: &str) -> StoreResult<&str> {
    URL_PREFIXES
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix))
        .filter(|path| !path.is_empty())
        .ok_or_else(|| StoreError::Unreachable {
            msg: format!("invalid sqlite url {}", url),
        })
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn identifier(&self) -> &str {
        SQLITE_DRIVER
    }

    fn open(&self, url: &str, _credentials: &Credentials) -> StoreResult<SqliteConnection> {
        let path = database_path(url)?;
        let conn = if path == IN_MEMORY {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
            )
        }
        .map_err(|e| StoreError::Unreachable {
            msg: format!("{} ({})", path, e),
        })?;

        Ok(SqliteConnection { conn })
    }
}

/// An open SQLite database
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

fn query_err(e: rusqlite::Error) -> StoreError {
    StoreError::Query { msg: e.to_string() }
}

fn to_value(column: &str, value: ValueRef<'_>) -> StoreResult<Value> {
    let value = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::Text(text.to_string()),
            Err(e) => {
                return Err(StoreError::Query {
                    msg: format!("column {} holds invalid UTF-8 text: {}", column, e),
                })
            }
        },
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    };
    Ok(value)
}

impl Connection for SqliteConnection {
    fn execute(
        &mut self,
        query: &str,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> StoreResult<()> {
        let mut stmt = self.conn.prepare(query).map_err(query_err)?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
            .into();
        let col_count = columns.len();

        let mut rows = stmt.query([]).map_err(query_err)?;
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut values = Vec::with_capacity(col_count);
            for (i, column) in columns.iter().enumerate() {
                values.push(to_value(column, row.get_ref(i).map_err(query_err)?)?);
            }
            if let ControlFlow::Break(()) = visit(Row::new(columns.clone(), values)) {
                break;
            }
        }
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| query_err(e))
    }
}
