// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use super::{
    checkpoint::CheckpointState, collector::Collector, connection::ConnectionManager,
    convert::RowConverter, query::QueryProvider,
};
use crate::{
    conf::logger::SourceLogger,
    error::{Error, SourceResult},
    store::{Connection, Driver},
    util::get_system_time,
};
use slog::{debug, error, info};
use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Lets the engine ask a source to stop from any thread
///
/// A poll cycle in flight finishes the row it is working on and returns.
/// No new cycle is started once teardown has been requested.
#[derive(Debug, Clone, Default)]
pub struct TeardownHandle {
    requested: Arc<AtomicBool>,
}

impl TeardownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// Outcome of a completed poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleStats {
    /// Tuples handed to the collector
    pub emitted: usize,
    /// Whether the cycle stopped early because of a teardown request
    pub interrupted: bool,
}

/// Everything a poll cycle needs, borrowed from its owner
pub struct PollCycle<'a, D, Q, R, T>
where
    D: Driver,
{
    pub connection: &'a mut ConnectionManager<D>,
    pub query_provider: &'a mut Q,
    pub row_converter: &'a mut R,
    pub checkpoint: &'a mut CheckpointState<T>,
    pub teardown: &'a TeardownHandle,
    pub logger: &'a SourceLogger,
}

impl<'a, D, Q, R, T> PollCycle<'a, D, Q, R, T>
where
    D: Driver,
    Q: QueryProvider<T>,
    R: RowConverter<T>,
    T: Clone,
{
    /// Runs one query and drains its cursor into `collector`.
    ///
    /// Tuples are emitted in cursor order and the checkpoint is advanced only
    /// after the collector accepted a tuple. On a query failure the connection
    /// is closed before the error is returned. A conversion failure on row `k`
    /// leaves the `k - 1` earlier emissions in place.
    pub fn run<O>(self, collector: &mut O) -> SourceResult<CycleStats>
    where
        O: Collector<T> + ?Sized,
    {
        let PollCycle {
            connection,
            query_provider,
            row_converter,
            checkpoint,
            teardown,
            logger,
        } = self;

        if teardown.is_requested() {
            debug!(logger, "Teardown requested, skipping poll cycle");
            return Ok(CycleStats {
                emitted: 0,
                interrupted: true,
            });
        }

        let query = query_provider
            .query_to_retrieve_data(checkpoint)
            .map_err(Error::from)?;
        debug!(logger, "select statement: {}", query);

        let conn = match connection.connection_mut() {
            Some(conn) => conn,
            None => return crate::unsupported!("poll cycle without an open connection"),
        };

        let mut stats = CycleStats::default();
        let mut failure: Option<Error> = None;

        let executed = conn.execute(&query, &mut |row| {
            if teardown.is_requested() {
                stats.interrupted = true;
                return ControlFlow::Break(());
            }
            let row_num = stats.emitted + 1;

            let tuple = match row_converter.row_to_tuple(row) {
                Ok(tuple) => tuple,
                Err(source) => {
                    failure = Some(Error::Conversion {
                        row: row_num,
                        source,
                    });
                    return ControlFlow::Break(());
                }
            };

            if collector.emit(tuple.clone()).is_err() {
                failure = Some(Error::Disconnected { row: row_num });
                return ControlFlow::Break(());
            }
            // save a checkpoint of how far we have emitted
            checkpoint.record(tuple, get_system_time());
            stats.emitted += 1;
            ControlFlow::Continue(())
        });

        if let Err(source) = executed {
            error!(
                logger,
                "Error while running query {} after {} rows: {}", query, stats.emitted, source
            );
            connection.close();
            return Err(Error::QueryExecution { query, source });
        }

        if let Some(err) = failure {
            error!(logger, "Poll cycle aborted after {} rows: {}", stats.emitted, err);
            return Err(err);
        }

        if stats.interrupted {
            info!(
                logger,
                "Teardown requested, poll cycle stopped after {} rows", stats.emitted
            );
        }

        Ok(stats)
    }
}
