// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use serde::Deserialize;
use slog::{o, Drain, Logger};
use std::{fs::OpenOptions, io, path::Path};

/// Alias for logger used by polling sources
pub type SourceLogger = Logger;

pub const SOURCE_LOG_NAME: &str = "arcon_db_source.log";

/// Defines a logger type
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum LoggerType {
    /// Logs output directly to the terminal
    Terminal,
    /// Logs output to file
    File,
}

impl Default for LoggerType {
    fn default() -> Self {
        LoggerType::Terminal
    }
}

pub fn term_logger() -> SourceLogger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).chan_size(1024).build().fuse();

    slog::Logger::root(
        drain,
        o!(
        "location" => slog::PushFnValue(|r: &slog::Record<'_>, ser: slog::PushFnValueSerializer<'_>| {
            ser.emit(format_args!("{}:{}", r.file(), r.line()))
        })),
    )
}

pub fn file_logger(log_path: impl AsRef<Path>) -> io::Result<SourceLogger> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).chan_size(1024).build().fuse();

    Ok(slog::Logger::root(
        drain,
        o!(
        "location" => slog::PushFnValue(|r: &slog::Record<'_>, ser: slog::PushFnValueSerializer<'_>| {
            ser.emit(format_args!("{}:{}", r.file(), r.line()))
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::info;

    #[test]
    fn file_logger_writes_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOURCE_LOG_NAME);
        {
            let logger = file_logger(&path).unwrap();
            info!(logger, "hello from the source");
        }
        assert!(path.exists());
    }
}
