// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use crate::error::SourceResult;

pub mod checkpoint;
pub mod collector;
pub mod connection;
pub mod convert;
pub mod emission;
pub mod operator;
pub mod query;

use collector::Collector;
use emission::CycleStats;
use operator::OperatorContext;

/// Lifecycle an engine drives a windowed source through
///
/// `setup → {begin_window → emit_tuples* → end_window}* → teardown`
///
/// All calls happen on the thread that owns the source. Errors are fatal for
/// the instance; the engine is expected to tear it down and restart it.
pub trait WindowedSource: Send {
    /// The type of tuples produced by the source
    type Data;

    /// Acquire resources. Called once per (re)start.
    fn setup(&mut self, ctx: &OperatorContext) -> SourceResult<()>;

    fn begin_window(&mut self, window_id: u64) -> SourceResult<()>;

    /// Run one poll cycle, handing every produced tuple to `collector`
    fn emit_tuples(&mut self, collector: &mut dyn Collector<Self::Data>) -> SourceResult<CycleStats>;

    fn end_window(&mut self) -> SourceResult<()>;

    /// Release resources. Safe to call any number of times, in any state.
    fn teardown(&mut self);
}
