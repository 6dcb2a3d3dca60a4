// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use crossbeam_channel::Sender;

/// Returned by [Collector::emit] when the tuple could not be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// The single output channel of a polling source
pub trait Collector<T> {
    /// Hand `tuple` downstream.
    ///
    /// May block until downstream has capacity. Ownership of the tuple passes
    /// to the channel once this returns `Ok`.
    fn emit(&mut self, tuple: T) -> Result<(), Disconnected>;
}

impl<T> Collector<T> for Vec<T> {
    #[inline]
    fn emit(&mut self, tuple: T) -> Result<(), Disconnected> {
        self.push(tuple);
        Ok(())
    }
}

/// Blocks on a full bounded channel
impl<T> Collector<T> for Sender<T> {
    #[inline]
    fn emit(&mut self, tuple: T) -> Result<(), Disconnected> {
        self.send(tuple).map_err(|_| Disconnected)
    }
}

impl<T, C: Collector<T> + ?Sized> Collector<T> for &mut C {
    #[inline]
    fn emit(&mut self, tuple: T) -> Result<(), Disconnected> {
        (**self).emit(tuple)
    }
}
