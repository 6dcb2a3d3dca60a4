// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory store driver used by the unit tests

use crate::{
    conf::logger::SourceLogger,
    store::{Connection, Credentials, Driver, Row, StoreError, StoreResult, Value},
};
use once_cell::sync::Lazy;
use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

pub const SCRIPTED_DRIVER: &str = "scripted";

static TEST_LOGGER: Lazy<SourceLogger> = Lazy::new(|| slog::Logger::root(slog::Discard, slog::o!()));

pub fn discard_logger() -> SourceLogger {
    TEST_LOGGER.clone()
}

/// Shared view into what a [ScriptedDriver] and its connections did
#[derive(Default)]
pub struct StoreTracker {
    opened: AtomicUsize,
    closed: AtomicUsize,
    queries: Mutex<Vec<String>>,
    columns: Mutex<Vec<String>>,
    rows: Mutex<Vec<Vec<Value>>>,
    fail_after: Mutex<Option<usize>>,
}

impl StoreTracker {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Append rows that following queries will return
    pub fn push_ids(&self, ids: &[i64]) {
        let mut rows = self.rows.lock().unwrap();
        rows.extend(ids.iter().map(|id| vec![Value::Integer(*id)]));
    }

    /// Make executions fail once `rows` rows have been handed out.
    pub fn fail_after(&self, rows: usize) {
        *self.fail_after.lock().unwrap() = Some(rows);
    }
}

/// Store driver that serves a fixed set of rows for any query
///
/// Every query returns all rows in insertion order. The query `FAIL` is
/// rejected before any row is produced.
#[derive(Clone)]
pub struct ScriptedDriver {
    tracker: Arc<StoreTracker>,
    unreachable: bool,
    credentials: Option<Credentials>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        let tracker = StoreTracker::default();
        *tracker.columns.lock().unwrap() = vec!["id".to_string()];
        Self {
            tracker: Arc::new(tracker),
            unreachable: false,
            credentials: None,
        }
    }

    /// Rows with a single integer column called `id`
    pub fn with_ids(self, ids: &[i64]) -> Self {
        self.tracker.push_ids(ids);
        self
    }

    pub fn with_rows(self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        *self.tracker.columns.lock().unwrap() = columns.iter().map(|c| c.to_string()).collect();
        *self.tracker.rows.lock().unwrap() = rows;
        self
    }

    pub fn fail_after(self, rows: usize) -> Self {
        self.tracker.fail_after(rows);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn require_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn tracker(&self) -> Arc<StoreTracker> {
        self.tracker.clone()
    }
}

impl Driver for ScriptedDriver {
    type Connection = ScriptedConnection;

    fn identifier(&self) -> &str {
        SCRIPTED_DRIVER
    }

    fn open(&self, url: &str, credentials: &Credentials) -> StoreResult<ScriptedConnection> {
        if self.unreachable {
            return Err(StoreError::Unreachable {
                msg: format!("no route to {}", url),
            });
        }
        if let Some(expected) = &self.credentials {
            if expected != credentials {
                return Err(StoreError::Rejected {
                    msg: "invalid user or password".to_string(),
                });
            }
        }
        self.tracker.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedConnection {
            tracker: self.tracker.clone(),
        })
    }
}

pub struct ScriptedConnection {
    tracker: Arc<StoreTracker>,
}

impl Connection for ScriptedConnection {
    fn execute(
        &mut self,
        query: &str,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> StoreResult<()> {
        self.tracker.queries.lock().unwrap().push(query.to_string());
        if query == "FAIL" {
            return Err(StoreError::Query {
                msg: "syntax error".to_string(),
            });
        }

        let columns: Arc<[String]> = self.tracker.columns.lock().unwrap().clone().into();
        let rows = self.tracker.rows.lock().unwrap().clone();
        let fail_after = *self.tracker.fail_after.lock().unwrap();

        for (idx, values) in rows.into_iter().enumerate() {
            if fail_after == Some(idx) {
                return Err(StoreError::Query {
                    msg: format!("cursor failed at row {}", idx + 1),
                });
            }
            if let ControlFlow::Break(()) = visit(Row::new(columns.clone(), values)) {
                break;
            }
        }
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        self.tracker.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
