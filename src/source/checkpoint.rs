// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use serde::{Deserialize, Serialize};

/// Progress record of a polling source
///
/// Holds the last tuple that was handed to the output channel together with
/// the wall-clock time (milliseconds since the Unix epoch) of the hand-off.
/// Persisting the state is up to the engine; it derives serde traits so a
/// snapshot can be taken and later fed back through
/// [PollingSource::restore_checkpoint](super::operator::PollingSource::restore_checkpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState<T> {
    last_emitted_tuple: Option<T>,
    last_emitted_timestamp: Option<u64>,
}

impl<T> Default for CheckpointState<T> {
    fn default() -> Self {
        Self {
            last_emitted_tuple: None,
            last_emitted_timestamp: None,
        }
    }
}

impl<T> CheckpointState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_emitted_tuple(&self) -> Option<&T> {
        self.last_emitted_tuple.as_ref()
    }

    pub fn last_emitted_timestamp(&self) -> Option<u64> {
        self.last_emitted_timestamp
    }

    /// True if nothing has been emitted yet
    pub fn is_empty(&self) -> bool {
        self.last_emitted_tuple.is_none()
    }

    /// Record a delivered tuple.
    ///
    /// The stored timestamp never moves backwards, a `timestamp` older than
    /// the current one is clamped to it. Returns the timestamp that was stored.
    #[inline]
    pub fn record(&mut self, tuple: T, timestamp: u64) -> u64 {
        let ts = match self.last_emitted_timestamp {
            Some(prev) => std::cmp::max(prev, timestamp),
            None => timestamp,
        };
        self.last_emitted_tuple = Some(tuple);
        self.last_emitted_timestamp = Some(ts);
        ts
    }
}
