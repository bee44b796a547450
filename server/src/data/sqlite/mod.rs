//! SQLite recorder backend
//!
//! Opens the recorder database read-only through a small connection pool
//! and executes statistics statements against it.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{ConnectOptions, Row, SqlitePool, TypeInfo, ValueRef};
use tracing::log::LevelFilter;

use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_MAX_CONNECTIONS};
use crate::data::error::DataError;
use crate::data::sql::Backend;
use crate::data::types::{RawRow, RawValue, SqlParam, SqlStatement};
use crate::data::QueryExecutor;

/// Read-only SQLite recorder
pub struct SqliteRecorder {
    pool: SqlitePool,
}

impl SqliteRecorder {
    /// Open an existing recorder database
    ///
    /// The file is never created; a missing database is a configuration error.
    pub async fn open(path: &Path) -> Result<Self, DataError> {
        if !path.is_file() {
            return Err(DataError::Config(format!(
                "Recorder database not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "SqliteRecorder opened");
        Ok(Self { pool })
    }

    /// Create a recorder from an existing pool (primarily for testing)
    #[cfg(test)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }
}

#[async_trait]
impl QueryExecutor for SqliteRecorder {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn query(&self, statement: &SqlStatement) -> Result<Vec<RawRow>, DataError> {
        let mut query = sqlx::query(statement.text());
        for param in statement.params() {
            query = match param {
                SqlParam::Text(s) => query.bind(s.clone()),
                SqlParam::Integer(n) => query.bind(*n),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(raw_row).collect()
    }
}

/// Convert a row using the storage class of each value
fn raw_row(row: &SqliteRow) -> Result<RawRow, DataError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            values.push(RawValue::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();
        let value = match type_name.as_str() {
            "INTEGER" => RawValue::Integer(row.try_get::<i64, _>(idx)?),
            "REAL" => RawValue::Real(row.try_get::<f64, _>(idx)?),
            _ => RawValue::Text(row.try_get_unchecked::<String, _>(idx)?),
        };
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_maps_storage_classes() {
        let recorder = SqliteRecorder::from_pool(memory_pool().await);
        let mut stmt = SqlStatement::new(4);
        stmt.push_clause("SELECT 'entity' AS tag, 7 AS n, 2.5 AS r, NULL AS missing");

        let rows = recorder.query(&stmt).await.unwrap();
        assert_eq!(
            rows,
            vec![vec![
                RawValue::Text("entity".to_string()),
                RawValue::Integer(7),
                RawValue::Real(2.5),
                RawValue::Null,
            ]]
        );
    }

    #[tokio::test]
    async fn test_query_binds_params_in_order() {
        let recorder = SqliteRecorder::from_pool(memory_pool().await);
        let mut stmt = SqlStatement::new(2);
        stmt.push_clause("SELECT ? AS a, ? AS b");
        stmt.push_param(SqlParam::Text("dev-1".to_string()));
        stmt.push_param(SqlParam::Integer(3));

        let rows = recorder.query(&stmt).await.unwrap();
        assert_eq!(
            rows[0],
            vec![RawValue::Text("dev-1".to_string()), RawValue::Integer(3)]
        );
    }

    #[tokio::test]
    async fn test_open_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteRecorder::open(&dir.path().join("absent.db")).await;
        assert!(matches!(result, Err(DataError::Config(_))));
    }

    #[tokio::test]
    async fn test_open_existing_file_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorder.db");

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true),
            )
            .await
            .unwrap();
        sqlx::query("CREATE TABLE readings (v INTEGER)")
            .execute(&writer)
            .await
            .unwrap();
        sqlx::query("INSERT INTO readings (v) VALUES (42)")
            .execute(&writer)
            .await
            .unwrap();
        writer.close().await;

        let recorder = SqliteRecorder::open(&path).await.unwrap();
        let mut select = SqlStatement::new(1);
        select.push_clause("SELECT v FROM readings");
        let rows = recorder.query(&select).await.unwrap();
        assert_eq!(rows, vec![vec![RawValue::Integer(42)]]);

        let mut insert = SqlStatement::new(0);
        insert.push_clause("INSERT INTO readings (v) VALUES (1)");
        assert!(recorder.query(&insert).await.is_err());
        recorder.close().await;
    }
}
