//! DuckDB recorder backend
//!
//! Uses a single read-only connection protected by a mutex. Statements run
//! on the blocking pool with a timeout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{AccessMode, Config, Connection};
use parking_lot::Mutex;

use crate::core::constants::DUCKDB_QUERY_TIMEOUT_SECS;
use crate::data::error::DataError;
use crate::data::sql::Backend;
use crate::data::types::{RawRow, RawValue, SqlParam, SqlStatement};
use crate::data::QueryExecutor;

/// Read-only DuckDB recorder
pub struct DuckdbRecorder {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbRecorder {
    /// Open an existing recorder database in read-only mode
    pub async fn open(path: &Path) -> Result<Self, DataError> {
        if !path.is_file() {
            return Err(DataError::Config(format!(
                "Recorder database not found: {}",
                path.display()
            )));
        }

        let db_path = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || {
            let config = Config::default().access_mode(AccessMode::ReadOnly)?;
            Connection::open_with_flags(&db_path, config)
        })
        .await
        .map_err(|e| DataError::Io(std::io::Error::other(e)))??;

        tracing::debug!(path = %path.display(), "DuckdbRecorder opened");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already opened connection
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a blocking DuckDB query with timeout
    async fn run_query<T, F>(f: F) -> Result<T, DataError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let timeout = Duration::from_secs(DUCKDB_QUERY_TIMEOUT_SECS);
        tokio::time::timeout(timeout, tokio::task::spawn_blocking(f))
            .await
            .map_err(|_| {
                tracing::warn!(
                    "DuckDB query timed out after {}s",
                    DUCKDB_QUERY_TIMEOUT_SECS
                );
                DataError::timeout("duckdb", DUCKDB_QUERY_TIMEOUT_SECS)
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "DuckDB query task failed");
                DataError::Io(std::io::Error::other(format!(
                    "Query execution failed: {}",
                    e
                )))
            })
    }
}

#[async_trait]
impl QueryExecutor for DuckdbRecorder {
    fn backend(&self) -> Backend {
        Backend::Duckdb
    }

    async fn query(&self, statement: &SqlStatement) -> Result<Vec<RawRow>, DataError> {
        let conn = Arc::clone(&self.conn);
        let sql = statement.text().to_string();
        let bind_values: Vec<Value> = statement
            .params()
            .iter()
            .map(|p| match p {
                SqlParam::Text(s) => Value::Text(s.clone()),
                SqlParam::Integer(n) => Value::BigInt(*n),
            })
            .collect();

        Self::run_query(move || {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&sql)?;
            let params_refs: Vec<&dyn duckdb::ToSql> = bind_values
                .iter()
                .map(|v| v as &dyn duckdb::ToSql)
                .collect();
            let rows = stmt.query_map(&*params_refs, |row| {
                let width = row.as_ref().column_count();
                (0..width)
                    .map(|idx| row.get::<_, Value>(idx).map(raw_value))
                    .collect::<Result<RawRow, _>>()
            })?;
            rows.collect::<Result<Vec<RawRow>, _>>()
                .map_err(DataError::from)
        })
        .await?
    }
}

fn raw_value(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Boolean(b) => RawValue::Integer(i64::from(b)),
        Value::TinyInt(n) => RawValue::Integer(n.into()),
        Value::SmallInt(n) => RawValue::Integer(n.into()),
        Value::Int(n) => RawValue::Integer(n.into()),
        Value::BigInt(n) => RawValue::Integer(n),
        Value::UTinyInt(n) => RawValue::Integer(n.into()),
        Value::USmallInt(n) => RawValue::Integer(n.into()),
        Value::UInt(n) => RawValue::Integer(n.into()),
        Value::UBigInt(n) => match i64::try_from(n) {
            Ok(n) => RawValue::Integer(n),
            Err(_) => RawValue::Text(n.to_string()),
        },
        Value::HugeInt(n) => match i64::try_from(n) {
            Ok(n) => RawValue::Integer(n),
            Err(_) => RawValue::Text(n.to_string()),
        },
        Value::Float(f) => RawValue::Real(f.into()),
        Value::Double(f) => RawValue::Real(f),
        Value::Text(s) => RawValue::Text(s),
        other => RawValue::Text(format!("{:?}", other)),
    }
}
