//! SQLite SQL dialect implementation

use super::SqlDialect;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn timestamp(&self, col: &str) -> String {
        format!("datetime({})", col)
    }

    fn date_text(&self, col: &str) -> String {
        format!("date({})", col)
    }

    fn hour_of_day(&self, col: &str) -> String {
        format!("CAST(strftime('%H', {}) AS INTEGER)", self.timestamp(col))
    }

    fn seconds_into_hour(&self, col: &str) -> String {
        // strftime('%s') yields text; cast both sides so the subtraction stays integral
        let ts = self.timestamp(col);
        format!(
            "(CAST(strftime('%s', {ts}) AS INTEGER) - CAST(strftime('%s', strftime('%Y-%m-%d %H:00:00', {ts})) AS INTEGER))"
        )
    }

    fn int_div(&self, lhs: &str, rhs: &str) -> String {
        // Integer operands divide with truncation
        format!("({} / {})", lhs, rhs)
    }

    fn order_by_with_nulls(&self, col: &str, desc: bool, nulls_last: bool) -> String {
        // SQLite doesn't support NULLS FIRST/LAST, emulate with CASE
        let dir = if desc { "DESC" } else { "ASC" };
        if nulls_last {
            format!(
                "CASE WHEN {} IS NULL THEN 1 ELSE 0 END, {} {}",
                col, col, dir
            )
        } else {
            format!(
                "CASE WHEN {} IS NULL THEN 0 ELSE 1 END, {} {}",
                col, col, dir
            )
        }
    }
}
