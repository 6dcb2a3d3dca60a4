// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use super::{
    checkpoint::CheckpointState,
    collector::Collector,
    connection::ConnectionManager,
    convert::RowConverter,
    emission::{CycleStats, PollCycle, TeardownHandle},
    query::QueryProvider,
    WindowedSource,
};
use crate::{
    conf::{logger::SourceLogger, SourceConf},
    error::{Error, SourceResult},
    store::{Credentials, Driver},
    unsupported,
};
use slog::{debug, error, info, o};
use uuid::Uuid;

/// Context handed to a source by the engine at setup
#[derive(Clone, Debug)]
pub struct OperatorContext {
    conf: SourceConf,
    logger: SourceLogger,
    id: Uuid,
}

impl OperatorContext {
    pub fn new(conf: SourceConf, logger: SourceLogger) -> Self {
        Self {
            conf,
            logger,
            id: Uuid::new_v4(),
        }
    }

    /// Creates a context that logs according to `conf`
    pub fn from_conf(conf: SourceConf) -> SourceResult<Self> {
        let logger = conf.source_logger()?;
        Ok(Self::new(conf, logger))
    }

    pub fn conf(&self) -> &SourceConf {
        &self.conf
    }

    pub fn logger(&self) -> &SourceLogger {
        &self.logger
    }

    /// Unique id of the operator instance
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// States a [PollingSource] moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    WindowOpen(u64),
    WindowClosed,
    TornDown,
}

/// A source operator that repeatedly queries an external store
///
/// Each [emit_tuples](WindowedSource::emit_tuples) call runs the query
/// produced by `Q`, converts every row with `R` and hands the tuples to the
/// collector. The last delivered tuple is kept in a [CheckpointState].
pub struct PollingSource<D, Q, R, T>
where
    D: Driver,
{
    connection: ConnectionManager<D>,
    query_provider: Q,
    row_converter: R,
    checkpoint: CheckpointState<T>,
    teardown: TeardownHandle,
    state: LifecycleState,
    logger: SourceLogger,
}

impl<D, Q, R, T> PollingSource<D, Q, R, T>
where
    D: Driver,
    Q: QueryProvider<T>,
    R: RowConverter<T>,
    T: Clone + Send + 'static,
{
    pub fn new(driver: D, query_provider: Q, row_converter: R) -> Self {
        let logger = slog::Logger::root(slog::Discard, o!());
        Self {
            connection: ConnectionManager::new(driver, String::new(), Credentials::default(), logger.clone()),
            query_provider,
            row_converter,
            checkpoint: CheckpointState::new(),
            teardown: TeardownHandle::new(),
            state: LifecycleState::Uninitialized,
            logger,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn checkpoint(&self) -> &CheckpointState<T> {
        &self.checkpoint
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }

    /// Handle that can request teardown from another thread
    pub fn teardown_handle(&self) -> TeardownHandle {
        self.teardown.clone()
    }

    /// Seed the checkpoint with a snapshot persisted by the engine
    ///
    /// Only allowed outside of an open window.
    pub fn restore_checkpoint(&mut self, checkpoint: CheckpointState<T>) -> SourceResult<()> {
        if let LifecycleState::WindowOpen(id) = self.state {
            return unsupported!("restoring a checkpoint inside window {}", id);
        }
        debug!(
            self.logger,
            "Restored checkpoint with timestamp {:?}",
            checkpoint.last_emitted_timestamp()
        );
        self.checkpoint = checkpoint;
        Ok(())
    }

    fn connect(&mut self, conf: &SourceConf) -> SourceResult<()> {
        conf.validate()?;

        let identifier = self.connection.driver().identifier();
        if conf.driver != identifier {
            return Err(Error::Configuration {
                msg: format!(
                    "driver {} does not match the provided driver {}",
                    conf.driver, identifier
                ),
            });
        }

        self.connection
            .reconfigure(&conf.store_url, conf.credentials(), self.logger.clone());
        self.connection.open()
    }
}

impl<D, Q, R, T> WindowedSource for PollingSource<D, Q, R, T>
where
    D: Driver,
    Q: QueryProvider<T>,
    R: RowConverter<T>,
    T: Clone + Send + 'static,
{
    type Data = T;

    fn setup(&mut self, ctx: &OperatorContext) -> SourceResult<()> {
        match self.state {
            LifecycleState::Uninitialized | LifecycleState::TornDown => (),
            other => return unsupported!("setup in state {:?}", other),
        }

        self.logger = ctx.logger().new(o!(
            "operator" => ctx.id().to_string(),
            "driver" => ctx.conf().driver.clone()
        ));
        self.teardown.reset();

        match self.connect(ctx.conf()) {
            Ok(()) => {
                info!(self.logger, "Source ready");
                self.state = LifecycleState::Ready;
                Ok(())
            }
            Err(err) => {
                error!(self.logger, "Setup failed: {}", err);
                self.connection.close();
                self.state = LifecycleState::TornDown;
                Err(err)
            }
        }
    }

    fn begin_window(&mut self, window_id: u64) -> SourceResult<()> {
        match self.state {
            LifecycleState::Ready | LifecycleState::WindowClosed => {
                self.state = LifecycleState::WindowOpen(window_id);
                Ok(())
            }
            other => unsupported!("begin_window({}) in state {:?}", window_id, other),
        }
    }

    fn emit_tuples(&mut self, collector: &mut dyn Collector<T>) -> SourceResult<CycleStats> {
        let window = match self.state {
            LifecycleState::WindowOpen(id) => id,
            other => return unsupported!("emit_tuples in state {:?}", other),
        };

        let res = PollCycle {
            connection: &mut self.connection,
            query_provider: &mut self.query_provider,
            row_converter: &mut self.row_converter,
            checkpoint: &mut self.checkpoint,
            teardown: &self.teardown,
            logger: &self.logger,
        }
        .run(collector);

        match &res {
            Ok(stats) => debug!(
                self.logger,
                "Emitted {} tuples in window {}", stats.emitted, window
            ),
            // The connection is gone, the instance cannot poll anymore
            Err(e) if e.is_store_failure() => self.state = LifecycleState::TornDown,
            Err(_) => (),
        }
        res
    }

    fn end_window(&mut self) -> SourceResult<()> {
        match self.state {
            LifecycleState::WindowOpen(_) => {
                self.state = LifecycleState::WindowClosed;
                Ok(())
            }
            other => unsupported!("end_window in state {:?}", other),
        }
    }

    fn teardown(&mut self) {
        self.teardown.request();
        self.connection.close();
        if self.state != LifecycleState::TornDown {
            info!(self.logger, "Source torn down");
            self.state = LifecycleState::TornDown;
        }
    }
}
