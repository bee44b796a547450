//! Aggregate bucket records

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Numeric statistic in the type the backend returned it
///
/// Minimum and maximum keep the target attribute's native type, the average
/// is a float.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
    /// SQL NULL, e.g. an aggregate over NULL attribute values only
    Missing,
}

impl fmt::Display for StatValue {
    /// Chart formatting: integers plain, floats with 5 fractional digits,
    /// text as given
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Integer(n) => write!(f, "{}", n),
            StatValue::Float(x) => write!(f, "{:.5}", x),
            StatValue::Text(s) => f.write_str(s),
            StatValue::Missing => f.write_str("null"),
        }
    }
}

/// One aggregate bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticRecord {
    pub probe_date: NaiveDate,
    pub hour: u32,
    pub minute_bucket: u32,
    pub entity_id: Option<String>,
    pub sub_entity_id: Option<String>,
    pub count: u64,
    pub minimum: StatValue,
    pub maximum: StatValue,
    pub average: StatValue,
}

impl StatisticRecord {
    /// X-axis label of the bucket, "HH:MM"
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute_bucket)
    }

    /// Display label of the sub-entity, e.g. "Channel: 03"
    ///
    /// Numeric identifiers are padded to two digits.
    pub fn sub_entity_printable(&self, prefix: &str) -> Option<String> {
        self.sub_entity_id
            .as_deref()
            .map(|id| match id.parse::<i64>() {
                Ok(n) => format!("{}: {:02}", prefix, n),
                Err(_) => format!("{}: {}", prefix, id),
            })
    }
}
