//! DuckDB SQL dialect implementation

use super::SqlDialect;

/// DuckDB SQL dialect
pub struct DuckdbDialect;

impl SqlDialect for DuckdbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn timestamp(&self, col: &str) -> String {
        format!("CAST({} AS TIMESTAMP)", col)
    }

    fn date_text(&self, col: &str) -> String {
        format!("strftime({}, '%Y-%m-%d')", self.timestamp(col))
    }

    fn hour_of_day(&self, col: &str) -> String {
        format!("CAST(hour({}) AS BIGINT)", self.timestamp(col))
    }

    fn seconds_into_hour(&self, col: &str) -> String {
        let ts = self.timestamp(col);
        format!("date_diff('second', date_trunc('hour', {ts}), {ts})")
    }

    fn int_div(&self, lhs: &str, rhs: &str) -> String {
        // `/` is floating point division in DuckDB
        format!("({} // {})", lhs, rhs)
    }

    fn order_by_with_nulls(&self, col: &str, desc: bool, nulls_last: bool) -> String {
        let dir = if desc { "DESC" } else { "ASC" };
        let nulls = if nulls_last {
            "NULLS LAST"
        } else {
            "NULLS FIRST"
        };
        format!("{} {} {}", col, dir, nulls)
    }
}
