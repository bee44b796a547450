//! Unified error type for the recorder backends
//!
//! Wraps errors from both query backends (SQLite, DuckDB) while keeping
//! track of which backend produced them.

use thiserror::Error;

/// Error raised while opening the recorder database or executing a query
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// DuckDB database error
    #[error("DuckDB error: {0}")]
    Duckdb(#[from] duckdb::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Query timeout
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_secs: u64,
    },
}

impl DataError {
    /// Create a timeout error
    pub fn timeout(backend: &'static str, timeout_secs: u64) -> Self {
        Self::Timeout {
            backend,
            timeout_secs,
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Duckdb(_) => "duckdb",
            Self::Timeout { backend, .. } => backend,
            Self::Config(_) | Self::Io(_) => "unknown",
        }
    }
}
