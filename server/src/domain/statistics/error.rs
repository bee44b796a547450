//! Statistics error types

use thiserror::Error;

use crate::data::DataError;

#[derive(Error, Debug)]
pub enum StatsError {
    /// The grouping parameters cannot be turned into a query
    #[error("Invalid grouping request: {0}")]
    InvalidGroupingRequest(String),

    /// A row carries a shape tag no decoder exists for
    #[error("Unknown result shape: {0}")]
    UnknownResultShape(String),

    /// A row with a known tag does not fit that shape's column layout
    #[error("Malformed {shape} row: {reason}")]
    MalformedRow { shape: &'static str, reason: String },

    /// The recorder backend failed to execute the statement
    #[error("Query execution failed: {0}")]
    QueryExecutionFailure(#[from] DataError),
}

impl StatsError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidGroupingRequest(reason.into())
    }

    pub(crate) fn malformed(shape: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            shape,
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's request parameters
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidGroupingRequest(_))
    }
}
