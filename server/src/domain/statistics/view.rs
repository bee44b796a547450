//! Regrouping / View Engine
//!
//! Reshapes an ordered sequence of [`StatisticRecord`]s into chart-ready
//! structures in a single pass. Records are never re-sorted: groups are
//! detected as runs of equal keys, so the input must be ordered by the
//! grouping key (the query builder's ORDER BY guarantees this).

use std::sync::OnceLock;

use serde::Serialize;
use serde::ser::SerializeMap;

use super::record::{StatValue, StatisticRecord};
use crate::core::constants::DEFAULT_SUB_ENTITY_PREFIX;

/// Line colors for per-entity and per-sub-entity series, cycled by ordinal
pub const LINE_COLORS: [&str; 12] = [
    "#ff0000", "#00ff00", "#0000ff", "#ffff00", "#ff00ff", "#00ffff", "#ff007f", "#7f00ff",
    "#00ff7f", "#ff7f00", "#7fff00", "#007fff",
];

pub const MINIMUM_COLOR: &str = "#99ff99";
pub const AVERAGE_COLOR: &str = "#99ccff";
pub const MAXIMUM_COLOR: &str = "#ff9999";

/// Statistic carried by a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Minimum,
    Average,
    Maximum,
}

impl Aggregate {
    pub fn label(self) -> &'static str {
        match self {
            Self::Minimum => "Minimum",
            Self::Average => "Average",
            Self::Maximum => "Maximum",
        }
    }

    /// Fixed series color, independent of the group
    pub fn color(self) -> &'static str {
        match self {
            Self::Minimum => MINIMUM_COLOR,
            Self::Average => AVERAGE_COLOR,
            Self::Maximum => MAXIMUM_COLOR,
        }
    }

    fn of(self, record: &StatisticRecord) -> &StatValue {
        match self {
            Self::Minimum => &record.minimum,
            Self::Average => &record.average,
            Self::Maximum => &record.maximum,
        }
    }
}

/// One colored line: label plus comma-joined values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    pub label: String,
    pub data: String,
    pub border_color: &'static str,
}

/// One chart: client-side id plus its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub chart_id: u32,
    pub data_sets: Vec<DataSet>,
}

/// Charts keyed by group, in first-flush order
///
/// Serializes as a JSON object. Flushing a key that already exists replaces
/// its chart in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartGroups {
    entries: Vec<(String, ChartSeries)>,
}

impl ChartGroups {
    fn insert(&mut self, key: String, series: ChartSeries) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = series,
            None => self.entries.push((key, series)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ChartSeries> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, series)| series)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ChartGroups {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, series) in &self.entries {
            map.serialize_entry(key, series)?;
        }
        map.end()
    }
}

/// View over one ordered result set
///
/// Grouped views are computed on first access and kept for the lifetime of
/// the view; repeated access returns the same structure.
#[derive(Debug)]
pub struct StatisticsView {
    records: Vec<StatisticRecord>,
    sub_entity_prefix: String,
    entities: OnceLock<Vec<String>>,
    trends_by_entity: OnceLock<ChartGroups>,
    trends_by_sub_entity: OnceLock<ChartGroups>,
    trends_by_entity_and_sub_entity: OnceLock<ChartGroups>,
    subs_by_entity: OnceLock<ChartGroups>,
}

impl StatisticsView {
    pub fn new(records: Vec<StatisticRecord>) -> Self {
        Self {
            records,
            sub_entity_prefix: DEFAULT_SUB_ENTITY_PREFIX.to_string(),
            entities: OnceLock::new(),
            trends_by_entity: OnceLock::new(),
            trends_by_sub_entity: OnceLock::new(),
            trends_by_entity_and_sub_entity: OnceLock::new(),
            subs_by_entity: OnceLock::new(),
        }
    }

    /// Prefix for sub-entity display labels ("Channel" gives "Channel: 03")
    pub fn with_sub_entity_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sub_entity_prefix = prefix.into();
        self
    }

    /// X-axis labels, run-length compressed over consecutive records
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for record in &self.records {
            let label = record.label();
            if labels.last() != Some(&label) {
                labels.push(label);
            }
        }
        labels
    }

    /// Distinct entity ids in order of first appearance
    pub fn entities(&self) -> &[String] {
        self.entities.get_or_init(|| {
            let mut entities: Vec<String> = Vec::new();
            for id in self.records.iter().filter_map(|r| r.entity_id.as_ref()) {
                if !entities.contains(id) {
                    entities.push(id.clone());
                }
            }
            entities
        })
    }

    pub fn minima(&self) -> String {
        self.joined(Aggregate::Minimum)
    }

    pub fn maxima(&self) -> String {
        self.joined(Aggregate::Maximum)
    }

    pub fn averages(&self) -> String {
        self.joined(Aggregate::Average)
    }

    pub fn minima_by_entity(&self) -> Vec<DataSet> {
        self.aggregate_by_entity(Aggregate::Minimum)
    }

    pub fn maxima_by_entity(&self) -> Vec<DataSet> {
        self.aggregate_by_entity(Aggregate::Maximum)
    }

    pub fn averages_by_entity(&self) -> Vec<DataSet> {
        self.aggregate_by_entity(Aggregate::Average)
    }

    /// Minimum/Average/Maximum chart per entity
    pub fn trends_by_entity(&self) -> &ChartGroups {
        self.trends_by_entity
            .get_or_init(|| self.trends_by(|r| r.entity_id.clone()))
    }

    /// Minimum/Average/Maximum chart per sub-entity, keyed by display label
    pub fn trends_by_sub_entity(&self) -> &ChartGroups {
        self.trends_by_sub_entity
            .get_or_init(|| self.trends_by(|r| r.sub_entity_printable(&self.sub_entity_prefix)))
    }

    /// Minimum/Average/Maximum chart per (entity, sub-entity) pair, keyed
    /// "entity / label"
    pub fn trends_by_entity_and_sub_entity(&self) -> &ChartGroups {
        self.trends_by_entity_and_sub_entity.get_or_init(|| {
            self.trends_by(|r| {
                let entity = r.entity_id.as_deref()?;
                let sub = r.sub_entity_printable(&self.sub_entity_prefix)?;
                Some(format!("{} / {}", entity, sub))
            })
        })
    }

    /// One chart per entity holding one average line per sub-entity
    ///
    /// Sub-entity colors cycle through [`LINE_COLORS`] and restart with every
    /// entity.
    pub fn subs_by_entity(&self) -> &ChartGroups {
        self.subs_by_entity.get_or_init(|| {
            let mut groups = ChartGroups::default();
            let mut open: Option<EntityGroup> = None;
            let mut chart_id = 0;

            for record in &self.records {
                let (Some(entity), Some(sub)) = (
                    record.entity_id.as_deref(),
                    record.sub_entity_printable(&self.sub_entity_prefix),
                ) else {
                    continue;
                };
                let value = record.average.to_string();

                if let Some(group) = open.as_mut().filter(|g| g.key == entity) {
                    group.push(sub, value);
                    continue;
                }
                let mut group = EntityGroup::new(entity.to_string());
                group.push(sub, value);
                if let Some(done) = open.replace(group) {
                    chart_id += 1;
                    let (key, series) = done.finish(chart_id);
                    groups.insert(key, series);
                }
            }
            if let Some(done) = open {
                chart_id += 1;
                let (key, series) = done.finish(chart_id);
                groups.insert(key, series);
            }
            groups
        })
    }

    /// Every grouped view in one serializable value
    pub fn snapshot(&self) -> ViewSnapshot<'_> {
        ViewSnapshot {
            labels: self.labels(),
            entities: self.entities(),
            minima: self.minima(),
            maxima: self.maxima(),
            averages: self.averages(),
            trends_by_entity: self.trends_by_entity(),
            trends_by_sub_entity: self.trends_by_sub_entity(),
            subs_by_entity: self.subs_by_entity(),
        }
    }

    fn joined(&self, aggregate: Aggregate) -> String {
        self.records
            .iter()
            .map(|r| aggregate.of(r).to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn aggregate_by_entity(&self, aggregate: Aggregate) -> Vec<DataSet> {
        let mut data_sets = Vec::new();
        let mut open: Option<(String, Vec<String>)> = None;

        for record in &self.records {
            let Some(entity) = record.entity_id.as_deref() else {
                continue;
            };
            let value = aggregate.of(record).to_string();

            if let Some((_, values)) = open.as_mut().filter(|(k, _)| k == entity) {
                values.push(value);
                continue;
            }
            if let Some((key, values)) = open.replace((entity.to_string(), vec![value])) {
                data_sets.push(entity_line(key, &values, data_sets.len()));
            }
        }
        if let Some((key, values)) = open {
            data_sets.push(entity_line(key, &values, data_sets.len()));
        }
        data_sets
    }

    /// Break-on-change grouping with one Minimum/Average/Maximum chart per run
    fn trends_by<F>(&self, key_of: F) -> ChartGroups
    where
        F: Fn(&StatisticRecord) -> Option<String>,
    {
        let mut groups = ChartGroups::default();
        let mut open: Option<TrendGroup> = None;
        let mut chart_id = 0;

        for record in &self.records {
            let Some(key) = key_of(record) else {
                continue;
            };
            if let Some(group) = open.as_mut().filter(|g| g.key == key) {
                group.push(record);
                continue;
            }
            if let Some(done) = open.replace(TrendGroup::start(key, record)) {
                chart_id += 1;
                groups.insert(done.key.clone(), done.into_series(chart_id));
            }
        }
        if let Some(done) = open {
            chart_id += 1;
            groups.insert(done.key.clone(), done.into_series(chart_id));
        }
        groups
    }
}

/// All views of one result set, as handed to the presentation layer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot<'a> {
    pub labels: Vec<String>,
    pub entities: &'a [String],
    pub minima: String,
    pub maxima: String,
    pub averages: String,
    pub trends_by_entity: &'a ChartGroups,
    pub trends_by_sub_entity: &'a ChartGroups,
    pub subs_by_entity: &'a ChartGroups,
}

fn entity_line(label: String, values: &[String], ordinal: usize) -> DataSet {
    DataSet {
        label,
        data: values.join(","),
        border_color: LINE_COLORS[ordinal % LINE_COLORS.len()],
    }
}

/// Open run of a Minimum/Average/Maximum chart
struct TrendGroup {
    key: String,
    minima: Vec<String>,
    averages: Vec<String>,
    maxima: Vec<String>,
}

impl TrendGroup {
    fn start(key: String, record: &StatisticRecord) -> Self {
        let mut group = Self {
            key,
            minima: Vec::new(),
            averages: Vec::new(),
            maxima: Vec::new(),
        };
        group.push(record);
        group
    }

    fn push(&mut self, record: &StatisticRecord) {
        self.minima.push(record.minimum.to_string());
        self.averages.push(record.average.to_string());
        self.maxima.push(record.maximum.to_string());
    }

    fn into_series(self, chart_id: u32) -> ChartSeries {
        let line = |aggregate: Aggregate, values: Vec<String>| DataSet {
            label: aggregate.label().to_string(),
            data: values.join(","),
            border_color: aggregate.color(),
        };
        ChartSeries {
            chart_id,
            data_sets: vec![
                line(Aggregate::Minimum, self.minima),
                line(Aggregate::Average, self.averages),
                line(Aggregate::Maximum, self.maxima),
            ],
        }
    }
}

/// Open entity run of the two-level view, with its open sub-entity run
struct EntityGroup {
    key: String,
    data_sets: Vec<DataSet>,
    sub: Option<(String, Vec<String>)>,
    color: usize,
}

impl EntityGroup {
    fn new(key: String) -> Self {
        Self {
            key,
            data_sets: Vec::new(),
            sub: None,
            color: 0,
        }
    }

    fn push(&mut self, sub: String, value: String) {
        if let Some((_, values)) = self.sub.as_mut().filter(|(k, _)| *k == sub) {
            values.push(value);
            return;
        }
        if let Some((label, values)) = self.sub.replace((sub, vec![value])) {
            self.flush_sub(label, values);
        }
    }

    fn flush_sub(&mut self, label: String, values: Vec<String>) {
        self.data_sets.push(DataSet {
            label,
            data: values.join(","),
            border_color: LINE_COLORS[self.color],
        });
        self.color = (self.color + 1) % LINE_COLORS.len();
    }

    fn finish(mut self, chart_id: u32) -> (String, ChartSeries) {
        if let Some((label, values)) = self.sub.take() {
            self.flush_sub(label, values);
        }
        let series = ChartSeries {
            chart_id,
            data_sets: self.data_sets,
        };
        (self.key, series)
    }
}
