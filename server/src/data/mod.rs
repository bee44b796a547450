//! Data storage layer
//!
//! Provides read access to the recorder database:
//! - `sqlite` - Embedded SQLite recorder (default)
//! - `duckdb` - DuckDB recorder file
//! - `types` - Statement and row types shared by both backends
//! - `sql` - SQL dialects for the expressions that differ per engine
//! - `error` - Unified error type for all backends
//!
//! ## Backend Support
//!
//! Statistics code only talks to [`QueryExecutor`]; both backends implement it.

pub mod duckdb;
pub mod error;
pub mod sql;
pub mod sqlite;
pub mod types;

pub use duckdb::DuckdbRecorder;
pub use error::DataError;
pub use sqlite::SqliteRecorder;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::RecorderBackend;
use sql::{Backend, SqlDialect};
use types::{RawRow, SqlStatement};

/// Executes a parameterized statement and returns rows as fixed-position
/// value sequences
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Backend the statements are executed on
    fn backend(&self) -> Backend;

    /// Execute a statement and collect every row
    async fn query(&self, statement: &SqlStatement) -> Result<Vec<RawRow>, DataError>;

    /// SQL dialect used to build statements for this executor
    fn dialect(&self) -> &'static dyn SqlDialect {
        self.backend().dialect()
    }
}

/// Recorder database service enum
///
/// Wraps the underlying backend-specific recorder. Services are stored as
/// Arc so handlers can share them.
pub enum RecorderService {
    /// SQLite backend (default)
    Sqlite(Arc<SqliteRecorder>),
    /// DuckDB backend
    Duckdb(Arc<DuckdbRecorder>),
}

impl RecorderService {
    /// Open the recorder database for the configured backend
    pub async fn open(backend: RecorderBackend, path: &Path) -> Result<Self, DataError> {
        match backend {
            RecorderBackend::Sqlite => {
                let recorder = SqliteRecorder::open(path).await?;
                Ok(Self::Sqlite(Arc::new(recorder)))
            }
            RecorderBackend::Duckdb => {
                let recorder = DuckdbRecorder::open(path).await?;
                Ok(Self::Duckdb(Arc::new(recorder)))
            }
        }
    }

    /// Get the executor trait object for statistics queries
    pub fn executor(&self) -> &dyn QueryExecutor {
        match self {
            Self::Sqlite(s) => s.as_ref(),
            Self::Duckdb(d) => d.as_ref(),
        }
    }

    /// Close the database connection gracefully
    pub async fn close(&self) {
        match self {
            Self::Sqlite(s) => s.close().await,
            Self::Duckdb(_) => tracing::debug!("DuckDB connection released on drop"),
        }
    }

    /// Get the backend type
    pub fn backend(&self) -> RecorderBackend {
        match self {
            Self::Sqlite(_) => RecorderBackend::Sqlite,
            Self::Duckdb(_) => RecorderBackend::Duckdb,
        }
    }
}
