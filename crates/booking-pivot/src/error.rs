use booking_columnar::QueryError;
use booking_model::ModelError;
use thiserror::Error;

pub type PivotResult<T> = Result<T, PivotError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PivotError {
    #[error("unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PivotError {
    pub(crate) fn unknown_column(column: impl Into<String>) -> Self {
        PivotError::UnknownColumn {
            column: column.into(),
        }
    }
}
