// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

//! A polling source for Arcon style windowed pipelines.
//!
//! A [PollingSource](source::operator::PollingSource) runs a query against an
//! external store once per poll cycle, turns each returned row into a tuple
//! and hands the tuples, in result order, to its output channel. The last
//! delivered tuple is tracked so an engine can snapshot progress and restore
//! it after a restart.
//!
//! ```no_run
//! use arcon_db_source::prelude::*;
//!
//! # fn main() -> SourceResult<()> {
//! let conf = SourceConf::new("sqlite:/data/events.db", SQLITE_DRIVER).with_table("events");
//! let converter = |row: Row| -> Result<i64, ConversionError> { Ok(row.get_i64("id")?) };
//! let mut source = PollingSource::new(SqliteDriver::new(), TableQuery::from_conf(&conf), converter);
//!
//! let mut out: Vec<i64> = Vec::new();
//! source.setup(&OperatorContext::from_conf(conf)?)?;
//! source.begin_window(0)?;
//! source.emit_tuples(&mut out)?;
//! source.end_window()?;
//! source.teardown();
//! # Ok(())
//! # }
//! ```

/// Error types
pub mod error;

/// Source configuration and logging
pub mod conf;
/// The polling source and its plug-in points
pub mod source;
/// Store driver contract and drivers
pub mod store;

/// Test module containing an in-memory store driver
#[cfg(test)]
mod test;
/// Internal utilities
mod util;

/// Helper module that imports everything related to the polling source into scope
pub mod prelude {
    pub use crate::{
        conf::{
            logger::{file_logger, term_logger, LoggerType, SourceLogger},
            SourceConf,
        },
        error::{Error, SourceResult},
        source::{
            checkpoint::CheckpointState,
            collector::{Collector, Disconnected},
            connection::ConnectionManager,
            convert::{ConversionError, RawRow, RowConverter},
            emission::{CycleStats, TeardownHandle},
            operator::{LifecycleState, OperatorContext, PollingSource},
            query::{QueryError, QueryProvider, StaticQuery, TableQuery},
            WindowedSource,
        },
        store::{Connection, Credentials, Driver, Row, RowError, StoreError, StoreResult, Value},
    };

    #[cfg(feature = "sqlite")]
    pub use crate::store::sqlite::{SqliteConnection, SqliteDriver, SQLITE_DRIVER};
}
