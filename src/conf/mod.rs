// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

pub mod logger;

use crate::{
    error::{Error, SourceResult},
    store::Credentials,
};
use hocon::HoconLoader;
use logger::{file_logger, term_logger, LoggerType, SourceLogger};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

/// Configuration for a polling source
#[derive(Deserialize, Clone, Debug)]
pub struct SourceConf {
    /// Location of the store, handed as is to the driver
    pub store_url: String,
    /// Identifier of the store driver to use
    pub driver: String,
    /// Table to read from
    ///
    /// Required unless a column mapping names the table.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Columns to read, as `table.column` or `column` entries
    #[serde(default)]
    pub column_mapping: Vec<String>,
    /// Advisory upper bound of rows per poll cycle
    #[serde(default = "batch_size_default")]
    pub batch_size: usize,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// [LoggerType] for source related logging
    #[serde(default)]
    pub logger_type: LoggerType,
    /// Directory that holds the log file when `logger_type` is `File`
    #[serde(default = "log_dir_default")]
    pub log_dir: PathBuf,
}

impl SourceConf {
    pub fn new(store_url: impl Into<String>, driver: impl Into<String>) -> Self {
        SourceConf {
            store_url: store_url.into(),
            driver: driver.into(),
            table_name: None,
            column_mapping: Vec::new(),
            batch_size: batch_size_default(),
            user: None,
            password: None,
            logger_type: LoggerType::default(),
            log_dir: log_dir_default(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn with_column_mapping(mut self, mapping: &[&str]) -> Self {
        self.column_mapping = mapping.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_logger_type(mut self, logger_type: LoggerType) -> Self {
        self.logger_type = logger_type;
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Loads SourceConf from a HOCON file
    pub fn from_file(path: impl AsRef<Path>) -> SourceResult<SourceConf> {
        let data = std::fs::read_to_string(path)?;
        data.parse()
    }

    /// Splits a column mapping entry into its table and column parts
    pub fn split_mapping(entry: &str) -> (Option<&str>, &str) {
        match entry.rfind('.') {
            Some(idx) => (Some(&entry[..idx]), &entry[idx + 1..]),
            None => (None, entry),
        }
    }

    /// The table to read from, either set directly or taken from the column mapping
    pub fn table(&self) -> Option<String> {
        self.table_name.clone().or_else(|| {
            self.column_mapping
                .iter()
                .find_map(|entry| Self::split_mapping(entry).0)
                .map(String::from)
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    /// Check the options that have no usable default
    pub fn validate(&self) -> SourceResult<()> {
        if self.store_url.trim().is_empty() {
            return Err(conf_err("store_url must be set"));
        }
        if self.driver.trim().is_empty() {
            return Err(conf_err("driver must be set"));
        }
        if self.batch_size < 1 {
            return Err(conf_err("batch_size must be at least 1"));
        }
        if let Some(entry) = self
            .column_mapping
            .iter()
            .find(|e| Self::split_mapping(e).1.is_empty())
        {
            return Err(conf_err(&format!("invalid column mapping entry {:?}", entry)));
        }
        match self.table() {
            Some(table) if !table.trim().is_empty() => Ok(()),
            _ => Err(conf_err(
                "table_name must be set unless the column mapping names the table",
            )),
        }
    }

    /// Logger selected by `logger_type`
    pub fn source_logger(&self) -> SourceResult<SourceLogger> {
        match self.logger_type {
            LoggerType::File => {
                std::fs::create_dir_all(&self.log_dir)?;
                Ok(file_logger(self.log_dir.join(logger::SOURCE_LOG_NAME))?)
            }
            LoggerType::Terminal => Ok(term_logger()),
        }
    }
}

impl FromStr for SourceConf {
    type Err = Error;

    /// Parse a SourceConf from a HOCON string
    fn from_str(data: &str) -> SourceResult<SourceConf> {
        let loader: HoconLoader = HoconLoader::new()
            .load_str(data)
            .map_err(|e| conf_err(&format!("Failed to load Hocon Loader with err {}", e)))?;

        loader
            .resolve()
            .map_err(|e| conf_err(&format!("Failed to resolve SourceConf with err {}", e)))
    }
}

fn conf_err(msg: &str) -> Error {
    Error::Configuration {
        msg: msg.to_string(),
    }
}

// Default values

fn batch_size_default() -> usize {
    1000
}

fn log_dir_default() -> PathBuf {
    let mut res = std::env::temp_dir();
    res.push("arcon");
    res
}
