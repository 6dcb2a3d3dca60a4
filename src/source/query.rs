// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use super::checkpoint::CheckpointState;
use crate::conf::SourceConf;
use snafu::Snafu;

/// Raised when a [QueryProvider] cannot produce a query
#[derive(Debug, Snafu)]
#[snafu(display("Unable to build query: {}", msg))]
pub struct QueryError {
    msg: String,
}

impl QueryError {
    pub fn new(msg: impl Into<String>) -> Self {
        QueryError { msg: msg.into() }
    }
}

/// Produces the query that is run for each poll cycle
///
/// Called once per cycle, synchronously, and must not touch the store.
/// The checkpoint of the previous cycles is passed in so an implementation
/// can skip rows that were already delivered. The stock providers of this
/// module do not, meaning a restarted source re-reads from the start.
pub trait QueryProvider<T>: Send + 'static {
    fn query_to_retrieve_data(&mut self, checkpoint: &CheckpointState<T>) -> Result<String, QueryError>;
}

impl<T, F> QueryProvider<T> for F
where
    F: FnMut(&CheckpointState<T>) -> Result<String, QueryError> + Send + 'static,
{
    #[inline]
    fn query_to_retrieve_data(&mut self, checkpoint: &CheckpointState<T>) -> Result<String, QueryError> {
        self(checkpoint)
    }
}

/// Runs the same query every cycle
#[derive(Debug, Clone)]
pub struct StaticQuery {
    query: String,
}

impl StaticQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

impl<T> QueryProvider<T> for StaticQuery {
    fn query_to_retrieve_data(&mut self, _: &CheckpointState<T>) -> Result<String, QueryError> {
        if self.query.trim().is_empty() {
            return Err(QueryError::new("empty query string"));
        }
        Ok(self.query.clone())
    }
}

/// Selects from the configured table
///
/// Produces `SELECT <columns> FROM <table> LIMIT <batch_size>`. Columns come
/// from the column mapping when one is set, otherwise all columns are read.
#[derive(Debug, Clone)]
pub struct TableQuery {
    table: Option<String>,
    columns: Vec<String>,
    limit: Option<usize>,
}

impl TableQuery {
    pub fn from_conf(conf: &SourceConf) -> Self {
        let table = conf.table();
        let columns = conf
            .column_mapping
            .iter()
            .filter_map(|entry| {
                let (t, column) = SourceConf::split_mapping(entry);
                match (t, table.as_deref()) {
                    // Only columns of the selected table
                    (Some(t), Some(selected)) if t != selected => None,
                    _ => Some(column.to_string()),
                }
            })
            .collect();

        Self {
            table,
            columns,
            limit: Some(conf.batch_size),
        }
    }

    /// Drop the `LIMIT` clause
    pub fn unbounded(mut self) -> Self {
        self.limit = None;
        self
    }
}

impl<T> QueryProvider<T> for TableQuery {
    fn query_to_retrieve_data(&mut self, _: &CheckpointState<T>) -> Result<String, QueryError> {
        let table = self
            .table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| QueryError::new("no table name configured"))?;

        let cols = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut query = format!("SELECT {} FROM {}", cols, table);
        if let Some(limit) = self.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> CheckpointState<u64> {
        CheckpointState::new()
    }

    #[test]
    fn static_query() {
        let mut q = StaticQuery::new("SELECT 1");
        assert_eq!(q.query_to_retrieve_data(&empty()).unwrap(), "SELECT 1");

        let mut q = StaticQuery::new("  ");
        assert!(QueryProvider::<u64>::query_to_retrieve_data(&mut q, &empty()).is_err());
    }

    #[test]
    fn table_query_defaults() {
        let conf = SourceConf::new("sqlite::memory:", "sqlite").with_table("events");
        let mut q = TableQuery::from_conf(&conf);
        assert_eq!(
            q.query_to_retrieve_data(&empty()).unwrap(),
            "SELECT * FROM events LIMIT 1000"
        );
        let mut q = q.unbounded();
        assert_eq!(
            q.query_to_retrieve_data(&empty()).unwrap(),
            "SELECT * FROM events"
        );
    }

    #[test]
    fn table_query_with_column_mapping() {
        let conf = SourceConf::new("sqlite::memory:", "sqlite")
            .with_column_mapping(&["events.id", "events.name", "other.skipped"])
            .with_batch_size(10);
        let mut q = TableQuery::from_conf(&conf);
        assert_eq!(
            q.query_to_retrieve_data(&empty()).unwrap(),
            "SELECT id, name FROM events LIMIT 10"
        );
    }

    #[test]
    fn table_query_without_table() {
        let conf = SourceConf::new("sqlite::memory:", "sqlite");
        let mut q = TableQuery::from_conf(&conf);
        let err = q.query_to_retrieve_data(&empty()).unwrap_err();
        assert_eq!(err.to_string(), "Unable to build query: no table name configured");
    }

    #[test]
    fn closure_reads_checkpoint() {
        let mut provider = |cp: &CheckpointState<u64>| -> Result<String, QueryError> {
            let offset = cp.last_emitted_tuple().copied().unwrap_or(0);
            Ok(format!("SELECT * FROM t WHERE id > {}", offset))
        };
        let mut cp = CheckpointState::new();
        assert_eq!(
            provider.query_to_retrieve_data(&cp).unwrap(),
            "SELECT * FROM t WHERE id > 0"
        );
        cp.record(5, 1);
        assert_eq!(
            provider.query_to_retrieve_data(&cp).unwrap(),
            "SELECT * FROM t WHERE id > 5"
        );
    }
}
