// Copyright (c) 2021, KTH Royal Institute of Technology.
// SPDX-License-Identifier: AGPL-3.0-only

use crate::store::{Row, RowError};
use snafu::Snafu;

/// Raised when a row cannot be turned into a tuple
#[derive(Debug, Snafu)]
#[snafu(display("{}", msg))]
pub struct ConversionError {
    msg: String,
}

impl ConversionError {
    pub fn new(msg: impl Into<String>) -> Self {
        ConversionError { msg: msg.into() }
    }
}

impl From<RowError> for ConversionError {
    fn from(error: RowError) -> Self {
        ConversionError::new(error.to_string())
    }
}

/// Maps one store row into one pipeline tuple
///
/// Called once per row in cursor order. Returning an error aborts the
/// current poll cycle; tuples emitted before the failing row stay emitted.
pub trait RowConverter<T>: Send + 'static {
    fn row_to_tuple(&mut self, row: Row) -> Result<T, ConversionError>;
}

impl<T, F> RowConverter<T> for F
where
    F: FnMut(Row) -> Result<T, ConversionError> + Send + 'static,
{
    #[inline]
    fn row_to_tuple(&mut self, row: Row) -> Result<T, ConversionError> {
        self(row)
    }
}

/// Converter that hands out the raw column values
#[derive(Debug, Default, Clone, Copy)]
pub struct RawRow;

impl RowConverter<Row> for RawRow {
    #[inline]
    fn row_to_tuple(&mut self, row: Row) -> Result<Row, ConversionError> {
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;
    use std::sync::Arc;

    #[test]
    fn closure_converter_propagates_row_errors() {
        let columns: Arc<[String]> = vec!["id".to_string()].into();
        let mut converter = |row: Row| -> Result<u64, ConversionError> { Ok(row.get_i64("id")? as u64) };

        let ok = Row::new(columns.clone(), vec![Value::Integer(3)]);
        assert_eq!(converter.row_to_tuple(ok).unwrap(), 3);

        let bad = Row::new(columns, vec![Value::from("three")]);
        let err = converter.row_to_tuple(bad).unwrap_err();
        assert_eq!(err.to_string(), "column id holds text but integer was expected");
    }
}
