//! Statistics Generator
//!
//! Combines the query builder, an injected [`QueryExecutor`] and the row
//! decoder. Every call re-queries; nothing is cached.

use chrono::NaiveDate;

use super::decode::decode_rows;
use super::error::StatsError;
use super::query::{GroupingLevel, QuerySpec, QuerySpecBuilder, entity_list_statement};
use super::record::StatisticRecord;
use super::schema::RecorderSchema;
use crate::data::QueryExecutor;
use crate::data::types::SqlStatement;

/// Optional trend parameters shared by the report operations
#[derive(Debug, Clone, Default)]
pub struct TrendOptions {
    /// Allow-listed attribute to aggregate, the schema default when unset
    pub target_attribute: Option<String>,
    /// Sub-hour bucket size in minutes, 0 groups by hour only
    pub minute_bucket_size: u32,
}

pub struct StatisticsGenerator<'a> {
    executor: &'a dyn QueryExecutor,
    schema: &'a RecorderSchema,
}

impl<'a> StatisticsGenerator<'a> {
    pub fn new(executor: &'a dyn QueryExecutor, schema: &'a RecorderSchema) -> Self {
        Self { executor, schema }
    }

    /// Distinct entities that published on `eval_date`
    pub async fn entities(&self, eval_date: NaiveDate) -> Result<Vec<StatisticRecord>, StatsError> {
        let stmt = entity_list_statement(eval_date, self.schema, self.executor.dialect());
        self.execute(&stmt).await
    }

    /// Trend for the whole day, optionally broken down by entity or by
    /// entity and sub-entity
    pub async fn overall_trend(
        &self,
        eval_date: NaiveDate,
        level: GroupingLevel,
        options: &TrendOptions,
    ) -> Result<Vec<StatisticRecord>, StatsError> {
        let spec = self.builder(level, eval_date, options).build(self.schema)?;
        self.run(&spec).await
    }

    /// Per-sub-entity trend of one entity
    pub async fn sub_entity_values(
        &self,
        entity_id: &str,
        eval_date: NaiveDate,
        options: &TrendOptions,
    ) -> Result<Vec<StatisticRecord>, StatsError> {
        let spec = self
            .builder(GroupingLevel::ByEntityAndSubEntity, eval_date, options)
            .entity_filter(entity_id)
            .build(self.schema)?;
        self.run(&spec).await
    }

    /// Execute an already built [`QuerySpec`]
    pub async fn run(&self, spec: &QuerySpec) -> Result<Vec<StatisticRecord>, StatsError> {
        let stmt = spec.to_statement(self.schema, self.executor.dialect());
        tracing::debug!(
            level = ?spec.level(),
            date = %spec.eval_date(),
            attribute = spec.target_attribute(),
            minutes = spec.minute_bucket_size(),
            entity = ?spec.entity_filter(),
            "Running statistics query"
        );
        self.execute(&stmt).await
    }

    fn builder(
        &self,
        level: GroupingLevel,
        eval_date: NaiveDate,
        options: &TrendOptions,
    ) -> QuerySpecBuilder {
        let mut builder =
            QuerySpecBuilder::new(level, eval_date).minute_bucket_size(options.minute_bucket_size);
        if let Some(attr) = &options.target_attribute {
            builder = builder.target_attribute(attr.clone());
        }
        builder
    }

    async fn execute(&self, stmt: &SqlStatement) -> Result<Vec<StatisticRecord>, StatsError> {
        tracing::trace!(sql = stmt.text(), params = ?stmt.params(), "Executing statement");
        let rows = self.executor.query(stmt).await.map_err(|e| {
            tracing::error!(backend = %self.executor.backend(), error = %e, "Statistics query failed");
            StatsError::QueryExecutionFailure(e)
        })?;
        let records = decode_rows(&rows)?;
        tracing::debug!(rows = records.len(), "Statistics query completed");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sql::Backend;
    use crate::data::types::{RawRow, RawValue};
    use crate::data::{DataError, DuckdbRecorder, SqliteRecorder};
    use crate::domain::statistics::record::StatValue;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sqlx::sqlite::SqlitePoolOptions;

    const FIXTURE: &[(&str, &str, i64, i64)] = &[
        ("2024-03-01 10:02:00", "dev-a", 1, 4),
        ("2024-03-01 10:03:10", "dev-a", 1, 6),
        ("2024-03-01 10:07:00", "dev-a", 2, 10),
        ("2024-03-01 10:59:59", "dev-a", 2, 20),
        ("2024-03-01 11:00:00", "dev-b", 1, 1),
        ("2024-03-01 11:31:00", "dev-b", 1, 3),
        ("2024-03-02 09:00:00", "dev-c", 1, 100),
    ];

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    async fn sqlite_recorder() -> SqliteRecorder {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE iot_recorder_input_probe (
                probe_time TEXT NOT NULL,
                device_id TEXT,
                channel_no INTEGER,
                value INTEGER
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (ts, dev, ch, value) in FIXTURE {
            sqlx::query("INSERT INTO iot_recorder_input_probe VALUES (?, ?, ?, ?)")
                .bind(*ts)
                .bind(*dev)
                .bind(*ch)
                .bind(*value)
                .execute(&pool)
                .await
                .unwrap();
        }
        SqliteRecorder::from_pool(pool)
    }

    fn duckdb_recorder() -> DuckdbRecorder {
        let conn = ::duckdb::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE iot_recorder_input_probe (
                probe_time TIMESTAMP, device_id VARCHAR, channel_no INTEGER, value BIGINT
            );",
        )
        .unwrap();
        for (ts, dev, ch, value) in FIXTURE {
            conn.execute(
                "INSERT INTO iot_recorder_input_probe VALUES (CAST(? AS TIMESTAMP), ?, ?, ?)",
                ::duckdb::params![ts, dev, ch, value],
            )
            .unwrap();
        }
        DuckdbRecorder::from_connection(conn)
    }

    /// Channels stored as zero-padded text, including an unpadded twin
    const PADDED_CHANNELS: &[(&str, &str, &str, i64)] = &[
        ("2024-03-01 10:02:00", "dev-a", "03", 5),
        ("2024-03-01 10:06:00", "dev-a", "03", 9),
        ("2024-03-01 10:04:00", "dev-a", "3", 7),
        ("2024-03-01 10:08:00", "dev-a", "04", 11),
    ];

    async fn sqlite_text_channel_recorder() -> SqliteRecorder {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE iot_recorder_input_probe (
                probe_time TEXT NOT NULL,
                device_id TEXT,
                channel_no TEXT,
                value INTEGER
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (ts, dev, ch, value) in PADDED_CHANNELS {
            sqlx::query("INSERT INTO iot_recorder_input_probe VALUES (?, ?, ?, ?)")
                .bind(*ts)
                .bind(*dev)
                .bind(*ch)
                .bind(*value)
                .execute(&pool)
                .await
                .unwrap();
        }
        SqliteRecorder::from_pool(pool)
    }

    fn duckdb_text_channel_recorder() -> DuckdbRecorder {
        let conn = ::duckdb::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE iot_recorder_input_probe (
                probe_time TIMESTAMP, device_id VARCHAR, channel_no VARCHAR, value BIGINT
            );",
        )
        .unwrap();
        for (ts, dev, ch, value) in PADDED_CHANNELS {
            conn.execute(
                "INSERT INTO iot_recorder_input_probe VALUES (CAST(? AS TIMESTAMP), ?, ?, ?)",
                ::duckdb::params![ts, dev, ch, value],
            )
            .unwrap();
        }
        DuckdbRecorder::from_connection(conn)
    }

    fn channel_spec(schema: &RecorderSchema, channel: &str) -> QuerySpec {
        QuerySpecBuilder::new(GroupingLevel::ByEntityAndSubEntity, day())
            .entity_filter("dev-a")
            .sub_entity_filter(channel)
            .build(schema)
            .unwrap()
    }

    type Summary = (Option<String>, Option<String>, u32, u32, u64);

    fn summary(records: &[StatisticRecord]) -> Vec<Summary> {
        records
            .iter()
            .map(|r| {
                (
                    r.entity_id.clone(),
                    r.sub_entity_id.clone(),
                    r.hour,
                    r.minute_bucket,
                    r.count,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_overall_trend_by_hour() {
        let recorder = sqlite_recorder().await;
        let schema = RecorderSchema::default();
        let generator = StatisticsGenerator::new(&recorder, &schema);

        let records = generator
            .overall_trend(day(), GroupingLevel::Overall, &TrendOptions::default())
            .await
            .unwrap();

        assert_eq!(
            summary(&records),
            vec![(None, None, 10, 0, 4), (None, None, 11, 0, 2)]
        );
        assert_eq!(records[0].minimum, StatValue::Integer(4));
        assert_eq!(records[0].maximum, StatValue::Integer(20));
        assert_eq!(records[0].average, StatValue::Float(10.0));
    }

    #[tokio::test]
    async fn test_five_minute_buckets_round_trip() {
        let recorder = sqlite_recorder().await;
        let schema = RecorderSchema::default();
        let generator = StatisticsGenerator::new(&recorder, &schema);
        let options = TrendOptions {
            minute_bucket_size: 5,
            ..Default::default()
        };

        let records = generator
            .overall_trend(day(), GroupingLevel::Overall, &options)
            .await
            .unwrap();

        assert_eq!(
            records
                .iter()
                .map(|r| (r.hour, r.minute_bucket))
                .collect::<Vec<_>>(),
            vec![(10, 0), (10, 5), (10, 55), (11, 0), (11, 30)]
        );
        for record in &records {
            assert!(record.minute_bucket < 60);
            assert_eq!(record.minute_bucket % 5, 0);
        }
    }

    #[tokio::test]
    async fn test_sub_entity_values_filters_entity() {
        let recorder = sqlite_recorder().await;
        let schema = RecorderSchema::default();
        let generator = StatisticsGenerator::new(&recorder, &schema);

        let records = generator
            .sub_entity_values("dev-a", day(), &TrendOptions::default())
            .await
            .unwrap();

        let a = Some("dev-a".to_string());
        assert_eq!(
            summary(&records),
            vec![
                (a.clone(), Some("1".to_string()), 10, 0, 2),
                (a, Some("2".to_string()), 10, 0, 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_sub_entity_filter_on_integer_channels() {
        let sqlite = sqlite_recorder().await;
        let duckdb = duckdb_recorder();
        let schema = RecorderSchema::default();
        let executors: [&dyn QueryExecutor; 2] = [&sqlite, &duckdb];
        let a = Some("dev-a".to_string());

        for executor in executors {
            let records = StatisticsGenerator::new(executor, &schema)
                .run(&channel_spec(&schema, "2"))
                .await
                .unwrap();
            assert_eq!(
                summary(&records),
                vec![(a.clone(), Some("2".to_string()), 10, 0, 2)],
                "{}",
                executor.backend()
            );
            assert_eq!(records[0].minimum, StatValue::Integer(10));
            assert_eq!(records[0].maximum, StatValue::Integer(20));
        }
    }

    #[tokio::test]
    async fn test_sub_entity_filter_matches_padded_text_exactly() {
        let sqlite = sqlite_text_channel_recorder().await;
        let duckdb = duckdb_text_channel_recorder();
        let schema = RecorderSchema::default();
        let executors: [&dyn QueryExecutor; 2] = [&sqlite, &duckdb];
        let a = Some("dev-a".to_string());

        for executor in executors {
            let generator = StatisticsGenerator::new(executor, &schema);

            let padded = generator.run(&channel_spec(&schema, "03")).await.unwrap();
            assert_eq!(
                summary(&padded),
                vec![(a.clone(), Some("03".to_string()), 10, 0, 2)],
                "{}",
                executor.backend()
            );
            assert_eq!(padded[0].minimum, StatValue::Integer(5));
            assert_eq!(padded[0].maximum, StatValue::Integer(9));

            let unpadded = generator.run(&channel_spec(&schema, "3")).await.unwrap();
            assert_eq!(
                summary(&unpadded),
                vec![(a.clone(), Some("3".to_string()), 10, 0, 1)],
                "{}",
                executor.backend()
            );

            let missing = generator.run(&channel_spec(&schema, "+3")).await.unwrap();
            assert!(missing.is_empty(), "{}", executor.backend());
        }
    }

    #[tokio::test]
    async fn test_entities_are_distinct_and_ordered() {
        let recorder = sqlite_recorder().await;
        let schema = RecorderSchema::default();
        let generator = StatisticsGenerator::new(&recorder, &schema);

        let records = generator.entities(day()).await.unwrap();
        let ids: Vec<_> = records.iter().filter_map(|r| r.entity_id.clone()).collect();
        assert_eq!(ids, vec!["dev-a", "dev-b"]);
    }

    #[tokio::test]
    async fn test_backends_agree() {
        let sqlite = sqlite_recorder().await;
        let duckdb = duckdb_recorder();
        let schema = RecorderSchema::default();
        let options = TrendOptions {
            minute_bucket_size: 15,
            ..Default::default()
        };

        for level in [
            GroupingLevel::Overall,
            GroupingLevel::ByEntity,
            GroupingLevel::ByEntityAndSubEntity,
        ] {
            let lhs = StatisticsGenerator::new(&sqlite, &schema)
                .overall_trend(day(), level, &options)
                .await
                .unwrap();
            let rhs = StatisticsGenerator::new(&duckdb, &schema)
                .overall_trend(day(), level, &options)
                .await
                .unwrap();
            assert_eq!(summary(&lhs), summary(&rhs), "{:?}", level);
        }

        let lhs = StatisticsGenerator::new(&sqlite, &schema)
            .entities(day())
            .await
            .unwrap();
        let rhs = StatisticsGenerator::new(&duckdb, &schema)
            .entities(day())
            .await
            .unwrap();
        assert_eq!(lhs, rhs);
    }

    #[tokio::test]
    async fn test_unknown_attribute_never_reaches_executor() {
        struct Recording(Mutex<Vec<String>>);

        #[async_trait]
        impl QueryExecutor for Recording {
            fn backend(&self) -> Backend {
                Backend::Sqlite
            }

            async fn query(&self, statement: &SqlStatement) -> Result<Vec<RawRow>, DataError> {
                self.0.lock().push(statement.text().to_string());
                Ok(Vec::new())
            }
        }

        let executor = Recording(Mutex::new(Vec::new()));
        let schema = RecorderSchema::default();
        let generator = StatisticsGenerator::new(&executor, &schema);
        let options = TrendOptions {
            target_attribute: Some("value; DROP TABLE x".to_string()),
            ..Default::default()
        };

        let result = generator
            .overall_trend(day(), GroupingLevel::Overall, &options)
            .await;
        assert!(matches!(
            result,
            Err(StatsError::InvalidGroupingRequest(_))
        ));
        assert!(executor.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure_propagates() {
        struct Failing;

        #[async_trait]
        impl QueryExecutor for Failing {
            fn backend(&self) -> Backend {
                Backend::Duckdb
            }

            async fn query(&self, _statement: &SqlStatement) -> Result<Vec<RawRow>, DataError> {
                Err(DataError::timeout("duckdb", 30))
            }
        }

        let schema = RecorderSchema::default();
        let result = StatisticsGenerator::new(&Failing, &schema)
            .entities(day())
            .await;
        assert!(matches!(
            result,
            Err(StatsError::QueryExecutionFailure(DataError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_shape_from_executor() {
        struct Foreign;

        #[async_trait]
        impl QueryExecutor for Foreign {
            fn backend(&self) -> Backend {
                Backend::Sqlite
            }

            async fn query(&self, _statement: &SqlStatement) -> Result<Vec<RawRow>, DataError> {
                Ok(vec![vec![RawValue::Text("t09".to_string())]])
            }
        }

        let schema = RecorderSchema::default();
        let result = StatisticsGenerator::new(&Foreign, &schema)
            .entities(day())
            .await;
        assert!(matches!(result, Err(StatsError::UnknownResultShape(_))));
    }
}
