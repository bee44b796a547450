//! Fact table layout of the recorder database

use std::sync::OnceLock;

use serde::Serialize;

use super::error::StatsError;
use crate::core::constants::{
    DEFAULT_ENTITY_COLUMN, DEFAULT_FACT_TABLE, DEFAULT_SUB_ENTITY_COLUMN,
    DEFAULT_SUB_ENTITY_PREFIX, DEFAULT_TARGET_ATTRIBUTE, DEFAULT_TIMESTAMP_COLUMN,
};

/// Names of the table and columns statistics are computed from
///
/// These are structural parts of the query text and therefore interpolated,
/// never bound. Every name must pass [`RecorderSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecorderSchema {
    pub table: String,
    pub timestamp_column: String,
    pub entity_column: String,
    pub sub_entity_column: String,
    /// Allow-list of numeric columns eligible as target attribute
    pub attributes: Vec<String>,
    pub default_attribute: String,
    /// Display prefix for sub-entity labels, e.g. "Channel"
    pub sub_entity_prefix: String,
}

impl Default for RecorderSchema {
    fn default() -> Self {
        Self {
            table: DEFAULT_FACT_TABLE.to_string(),
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            entity_column: DEFAULT_ENTITY_COLUMN.to_string(),
            sub_entity_column: DEFAULT_SUB_ENTITY_COLUMN.to_string(),
            attributes: vec![DEFAULT_TARGET_ATTRIBUTE.to_string()],
            default_attribute: DEFAULT_TARGET_ATTRIBUTE.to_string(),
            sub_entity_prefix: DEFAULT_SUB_ENTITY_PREFIX.to_string(),
        }
    }
}

impl RecorderSchema {
    /// Check that all structural names are plain SQL identifiers and that the
    /// default attribute is allow-listed
    pub fn validate(&self) -> Result<(), StatsError> {
        let structural = [
            ("table", &self.table),
            ("timestamp column", &self.timestamp_column),
            ("entity column", &self.entity_column),
            ("sub-entity column", &self.sub_entity_column),
        ];
        for (what, name) in structural {
            if !is_sql_identifier(name) {
                return Err(StatsError::invalid(format!(
                    "{} '{}' is not a valid identifier",
                    what, name
                )));
            }
        }

        if self.attributes.is_empty() {
            return Err(StatsError::invalid("attribute allow-list is empty"));
        }
        for attr in &self.attributes {
            if !is_sql_identifier(attr) {
                return Err(StatsError::invalid(format!(
                    "attribute '{}' is not a valid identifier",
                    attr
                )));
            }
        }
        self.check_attribute(&self.default_attribute)?;
        Ok(())
    }

    /// Resolve a requested target attribute against the allow-list
    ///
    /// Returns the allow-listed spelling so that only configured text ever
    /// reaches the query.
    pub fn check_attribute(&self, name: &str) -> Result<&str, StatsError> {
        self.attributes
            .iter()
            .find(|a| a.as_str() == name)
            .map(String::as_str)
            .ok_or_else(|| StatsError::invalid(format!("unknown target attribute '{}'", name)))
    }
}

/// Plain identifier: ASCII letter or underscore, then letters, digits, underscores
pub fn is_sql_identifier(s: &str) -> bool {
    static RE_IDENT: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE_IDENT
        .get_or_init(|| regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex"));
    re.is_match(s)
}
