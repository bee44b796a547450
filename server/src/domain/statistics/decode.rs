//! Row Decoder
//!
//! Maps positional result rows onto [`StatisticRecord`]s. Column 0 carries
//! the shape tag written by the query builder, which selects the layout.

use chrono::NaiveDate;

use super::error::StatsError;
use super::query::ResultShape;
use super::record::{StatValue, StatisticRecord};
use crate::data::types::{RawRow, RawValue};

/// Decode one row, dispatching on its shape tag
pub fn decode_row(row: &[RawValue]) -> Result<StatisticRecord, StatsError> {
    let shape = match row.first() {
        Some(RawValue::Text(tag)) => ResultShape::from_tag(tag)
            .ok_or_else(|| StatsError::UnknownResultShape(tag.clone()))?,
        Some(other) => {
            return Err(StatsError::UnknownResultShape(format!(
                "{} tag value",
                other.type_name()
            )));
        }
        None => return Err(StatsError::UnknownResultShape("empty row".to_string())),
    };

    if row.len() != shape.column_count() {
        return Err(StatsError::malformed(
            shape.tag(),
            format!("expected {} columns, got {}", shape.column_count(), row.len()),
        ));
    }

    let cols = Columns { row, shape };
    match shape {
        ResultShape::Overall => decode_trend(&cols, None),
        ResultShape::ByEntity => decode_trend(&cols, Some((4, None))),
        ResultShape::BySubEntity => decode_trend(&cols, Some((4, Some(5)))),
        ResultShape::EntityList => decode_entity_list(&cols),
    }
}

/// Decode a full result set, preserving row order
pub fn decode_rows(rows: &[RawRow]) -> Result<Vec<StatisticRecord>, StatsError> {
    rows.iter().map(|row| decode_row(row)).collect()
}

/// Trend rows: date, hour, minute, then optional key columns, then
/// count, min, max, avg
fn decode_trend(
    cols: &Columns<'_>,
    keys: Option<(usize, Option<usize>)>,
) -> Result<StatisticRecord, StatsError> {
    let (entity_id, sub_entity_id, first_stat) = match keys {
        None => (None, None, 4),
        Some((entity_idx, None)) => (cols.key(entity_idx)?, None, entity_idx + 1),
        Some((entity_idx, Some(sub_idx))) => {
            (cols.key(entity_idx)?, cols.key(sub_idx)?, sub_idx + 1)
        }
    };

    Ok(StatisticRecord {
        probe_date: cols.date(1)?,
        hour: cols.unsigned(2)?,
        minute_bucket: cols.unsigned(3)?,
        entity_id,
        sub_entity_id,
        count: cols.unsigned(first_stat)?,
        minimum: cols.stat(first_stat + 1),
        maximum: cols.stat(first_stat + 2),
        average: cols.stat(first_stat + 3),
    })
}

fn decode_entity_list(cols: &Columns<'_>) -> Result<StatisticRecord, StatsError> {
    Ok(StatisticRecord {
        probe_date: cols.date(1)?,
        hour: 0,
        minute_bucket: 0,
        entity_id: cols.key(2)?,
        sub_entity_id: None,
        count: 0,
        minimum: StatValue::Integer(0),
        maximum: StatValue::Integer(0),
        average: StatValue::Integer(0),
    })
}

/// Typed access to the columns of a row whose width was already checked
struct Columns<'a> {
    row: &'a [RawValue],
    shape: ResultShape,
}

impl Columns<'_> {
    fn mismatch(&self, idx: usize, expected: &str) -> StatsError {
        StatsError::malformed(
            self.shape.tag(),
            format!(
                "column {} should be {}, got {}",
                idx,
                expected,
                self.row[idx].type_name()
            ),
        )
    }

    /// Calendar date as written by the dialect (`YYYY-MM-DD`)
    fn date(&self, idx: usize) -> Result<NaiveDate, StatsError> {
        match &self.row[idx] {
            RawValue::Text(s) => {
                let day = s.get(..10).unwrap_or(s.as_str());
                NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                    StatsError::malformed(self.shape.tag(), format!("column {}: {}", idx, e))
                })
            }
            _ => Err(self.mismatch(idx, "a date")),
        }
    }

    /// Non-negative integer; engines may hand out hours as text
    fn unsigned<T: TryFrom<i64>>(&self, idx: usize) -> Result<T, StatsError> {
        let n = match &self.row[idx] {
            RawValue::Integer(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse::<i64>().ok(),
            RawValue::Real(x) if x.fract() == 0.0 => Some(*x as i64),
            _ => None,
        };
        n.and_then(|n| T::try_from(n).ok())
            .ok_or_else(|| self.mismatch(idx, "a non-negative integer"))
    }

    /// Entity or sub-entity identifier, absent when NULL
    fn key(&self, idx: usize) -> Result<Option<String>, StatsError> {
        match &self.row[idx] {
            RawValue::Null => Ok(None),
            RawValue::Text(s) => Ok(Some(s.clone())),
            RawValue::Integer(n) => Ok(Some(n.to_string())),
            RawValue::Real(_) => Err(self.mismatch(idx, "an identifier")),
        }
    }

    fn stat(&self, idx: usize) -> StatValue {
        match &self.row[idx] {
            RawValue::Null => StatValue::Missing,
            RawValue::Integer(n) => StatValue::Integer(*n),
            RawValue::Real(x) => StatValue::Float(*x),
            RawValue::Text(s) => StatValue::Text(s.clone()),
        }
    }
}
