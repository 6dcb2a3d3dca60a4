// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

/// A helper macro for reporting lifecycle misuse
#[macro_export]
macro_rules! unsupported {
    ( $($arg:tt)* ) => ({
        $crate::error::SourceResult::Err($crate::error::Error::Unsupported { msg: format!($($arg)*) })
    })
}

use crate::{
    source::{convert::ConversionError, query::QueryError},
    store::StoreError,
};
use snafu::Snafu;
use std::io;

/// Top level Result type for the polling source
pub type SourceResult<T> = std::result::Result<T, Error>;

/// Errors that are fatal to a polling source instance.
///
/// No variant is retried internally. Recovery is left to the engine that
/// restarts the operator and replays from its persisted checkpoint.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The store was unreachable or rejected the credentials during setup.
    #[snafu(display("Failed to connect to {}: {}", url, source))]
    Connection { url: String, source: StoreError },
    /// The operator was configured in a way it cannot run with.
    #[snafu(display("Invalid configuration {}", msg))]
    Configuration { msg: String },
    /// The store rejected or failed the query while it was being executed.
    #[snafu(display("Error while running query {}: {}", query, source))]
    QueryExecution { query: String, source: StoreError },
    /// Row number `row` (1-based, within its poll cycle) could not be turned into a tuple.
    #[snafu(display("Failed to convert row {} into a tuple: {}", row, source))]
    Conversion { row: usize, source: ConversionError },
    /// The output channel has no receiving side anymore.
    #[snafu(display("Output channel disconnected while emitting row {}", row))]
    Disconnected { row: usize },
    /// The operator has been driven in an unsupported way.
    #[snafu(display("Unsupported operation {}", msg))]
    Unsupported { msg: String },
    /// A read or write error has happened when interacting with the file system.
    #[snafu(display("An IO error occured {}", error))]
    Io { error: io::Error },
}

impl Error {
    /// Returns true if the error was caused by the store itself
    /// rather than by the operator's plug-ins or its driver.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::QueryExecution { .. })
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(io_error: io::Error) -> Self {
        Error::Io { error: io_error }
    }
}

impl From<QueryError> for Error {
    fn from(error: QueryError) -> Self {
        Error::Configuration {
            msg: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_becomes_configuration_error() {
        let err: Error = QueryError::new("no table configured").into();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(!err.is_store_failure());
        assert_eq!(
            err.to_string(),
            "Invalid configuration Unable to build query: no table configured"
        );
    }

    #[test]
    fn unsupported_macro() {
        let res: SourceResult<()> = unsupported!("emit in state {}", "Ready");
        match res {
            Err(Error::Unsupported { msg }) => assert_eq!(msg, "emit in state Ready"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
