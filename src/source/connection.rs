// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use crate::{
    conf::logger::SourceLogger,
    error::{Error, SourceResult},
    store::{Connection, Credentials, Driver},
};
use slog::{debug, info, warn};

/// Owns the store handle of a single source instance
pub struct ConnectionManager<D: Driver> {
    driver: D,
    url: String,
    credentials: Credentials,
    connection: Option<D::Connection>,
    logger: SourceLogger,
}

impl<D: Driver> ConnectionManager<D> {
    pub fn new(driver: D, url: impl Into<String>, credentials: Credentials, logger: SourceLogger) -> Self {
        Self {
            driver,
            url: url.into(),
            credentials,
            connection: None,
            logger,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Point the manager at another store. Only allowed while closed.
    pub(crate) fn reconfigure(&mut self, url: &str, credentials: Credentials, logger: SourceLogger) {
        debug_assert!(self.connection.is_none());
        self.url = url.to_string();
        self.credentials = credentials;
        self.logger = logger;
    }

    /// Acquire a connection. A no-op if one is already held.
    pub fn open(&mut self) -> SourceResult<()> {
        if self.connection.is_some() {
            debug!(self.logger, "Connection to {} already open", self.url);
            return Ok(());
        }

        let conn = self
            .driver
            .open(&self.url, &self.credentials)
            .map_err(|source| Error::Connection {
                url: self.url.clone(),
                source,
            })?;

        info!(self.logger, "Opened connection to {}", self.url);
        self.connection = Some(conn);
        Ok(())
    }

    /// Release the connection if one is held. Failures are only logged.
    pub fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            match conn.close() {
                Ok(()) => info!(self.logger, "Closed connection to {}", self.url),
                Err(err) => warn!(
                    self.logger,
                    "Error while closing connection to {}: {}", self.url, err
                ),
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connection_mut(&mut self) -> Option<&mut D::Connection> {
        self.connection.as_mut()
    }
}

impl<D: Driver> Drop for ConnectionManager<D> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{discard_logger, ScriptedDriver};

    #[test]
    fn open_close_idempotent() {
        let driver = ScriptedDriver::new();
        let tracker = driver.tracker();
        let mut manager = ConnectionManager::new(driver, "mem://", Credentials::default(), discard_logger());

        assert!(!manager.is_open());
        manager.open().unwrap();
        manager.open().unwrap();
        assert!(manager.is_open());
        assert_eq!(tracker.opened(), 1);

        manager.close();
        manager.close();
        assert!(!manager.is_open());
        assert_eq!(tracker.closed(), 1);
    }

    #[test]
    fn unreachable_store() {
        let driver = ScriptedDriver::new().unreachable();
        let mut manager = ConnectionManager::new(driver, "mem://down", Credentials::default(), discard_logger());

        match manager.open() {
            Err(Error::Connection { url, .. }) => assert_eq!(url, "mem://down"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!manager.is_open());
        manager.close();
    }

    #[test]
    fn rejected_credentials() {
        let driver = ScriptedDriver::new().require_credentials(Credentials::new("arcon", "pw"));
        let mut manager =
            ConnectionManager::new(driver.clone(), "mem://", Credentials::new("arcon", "wrong"), discard_logger());
        assert!(matches!(manager.open(), Err(Error::Connection { .. })));

        let mut manager =
            ConnectionManager::new(driver, "mem://", Credentials::new("arcon", "pw"), discard_logger());
        assert!(manager.open().is_ok());
    }

    #[test]
    fn close_on_drop() {
        let driver = ScriptedDriver::new();
        let tracker = driver.tracker();
        {
            let mut manager = ConnectionManager::new(driver, "mem://", Credentials::default(), discard_logger());
            manager.open().unwrap();
        }
        assert_eq!(tracker.closed(), 1);
    }
}
