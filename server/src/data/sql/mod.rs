//! SQL abstraction layer for multi-database support
//!
//! This module provides abstractions for generating SQL that works across
//! the recorder backends (SQLite, DuckDB).

mod dialect;
mod duckdb_dialect;
mod sqlite_dialect;

pub use dialect::SqlDialect;
pub use duckdb_dialect::DuckdbDialect;
pub use sqlite_dialect::SqliteDialect;

/// Database backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Duckdb,
}

impl Backend {
    /// Get the SQL dialect for this backend
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Backend::Sqlite => &SqliteDialect,
            Backend::Duckdb => &DuckdbDialect,
        }
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Duckdb => "duckdb",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_dialect_names_match() {
        assert_eq!(Backend::Sqlite.dialect().name(), Backend::Sqlite.name());
        assert_eq!(Backend::Duckdb.dialect().name(), Backend::Duckdb.name());
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Duckdb.to_string(), "duckdb");
    }
}
