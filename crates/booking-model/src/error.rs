use booking_columnar::{ColumnType, QueryError};
use thiserror::Error;

/// Failure to produce a [`crate::Dataset`] from a data source.
///
/// Fatal at startup: no partial dataset is ever returned.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("input has no header row")]
    EmptyInput,
    #[error("input has no data rows after removing duplicates")]
    NoRows,
    #[error("required column `{column}` is missing")]
    MissingColumn { column: String },
    #[error("parse error at row {row}, column `{column}`: {reason}")]
    Parse {
        row: u64,
        column: String,
        reason: String,
    },
    #[error("cannot read `{column}` as {column_type} at row {row}: {value:?}")]
    InvalidField {
        row: u64,
        column: String,
        column_type: ColumnType,
        value: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Query(#[from] QueryError),
}
