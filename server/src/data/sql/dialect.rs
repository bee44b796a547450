//! SQL dialect trait for multi-database support
//!
//! This trait defines the engine-specific expressions the statistics queries
//! are composed from.

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders
/// - Timestamp parsing and truncation
/// - Date/time field extraction
/// - NULL ordering
///
/// Every dialect must derive identical hour and minute-bucket boundaries
/// for the same timestamp.
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite/DuckDB: Always returns "?"
    fn placeholder(&self, index: usize) -> String;

    /// Interpret a stored column as a timestamp
    ///
    /// - SQLite: `datetime(col)`
    /// - DuckDB: `CAST(col AS TIMESTAMP)`
    fn timestamp(&self, col: &str) -> String;

    /// Calendar date of a timestamp column, as `YYYY-MM-DD` text
    ///
    /// - SQLite: `date(col)`
    /// - DuckDB: `strftime(CAST(col AS TIMESTAMP), '%Y-%m-%d')`
    fn date_text(&self, col: &str) -> String;

    /// Hour of day (0-23) of a timestamp column, as an integer
    fn hour_of_day(&self, col: &str) -> String;

    /// Whole seconds elapsed since the top of the hour of a timestamp column
    fn seconds_into_hour(&self, col: &str) -> String;

    /// Integer division of two integer expressions, truncating
    fn int_div(&self, lhs: &str, rhs: &str) -> String;

    /// Start-of-bucket minute offset for buckets of `bucket_minutes` minutes
    ///
    /// `m * floor((seconds_into_hour / 60) / m)`; a size of 0 disables
    /// sub-hour grouping and yields the constant `0`.
    fn minute_bucket(&self, col: &str, bucket_minutes: u32) -> String {
        if bucket_minutes == 0 {
            return "0".to_string();
        }
        let minutes = self.int_div(&self.seconds_into_hour(col), "60");
        format!(
            "{} * {}",
            bucket_minutes,
            self.int_div(&minutes, &bucket_minutes.to_string())
        )
    }

    /// Generate ORDER BY clause with NULL handling
    ///
    /// - DuckDB: `col ASC NULLS FIRST`
    /// - SQLite: Doesn't support NULLS FIRST/LAST
    fn order_by_with_nulls(&self, col: &str, desc: bool, nulls_last: bool) -> String;
}
