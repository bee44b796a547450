//! Query Spec Builder
//!
//! Translates a grouping level, evaluation date, target attribute and
//! minute-bucket size into a parameterized aggregate statement against the
//! recorder fact table. Every statement yields rows whose first column is a
//! shape tag; the remaining columns follow the shape's fixed layout (see
//! [`ResultShape::column_count`]):
//!
//! | pos | overall | entity | sub_entity | entity_list |
//! |-----|---------|--------|------------|-------------|
//! | 0   | tag     | tag    | tag        | tag         |
//! | 1   | date    | date   | date       | date        |
//! | 2   | hour    | hour   | hour       | entity      |
//! | 3   | minute  | minute | minute     |             |
//! | 4   | count   | entity | entity     |             |
//! | 5   | min     | count  | sub_entity |             |
//! | 6   | max     | min    | count      |             |
//! | 7   | avg     | max    | min        |             |
//! | 8   |         | avg    | max        |             |
//! | 9   |         |        | avg        |             |

use chrono::NaiveDate;

use super::error::StatsError;
use super::schema::RecorderSchema;
use crate::core::constants::MAX_MINUTE_BUCKET_SIZE;
use crate::data::sql::SqlDialect;
use crate::data::types::{SqlParam, SqlStatement};

/// Granularity of aggregation; each level implies the ones below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupingLevel {
    Overall,
    ByEntity,
    ByEntityAndSubEntity,
}

impl GroupingLevel {
    /// Map the boolean grouping switches onto a level
    ///
    /// Sub-entity grouping without entity grouping has no level.
    pub fn from_flags(by_entity: bool, by_sub_entity: bool) -> Result<Self, StatsError> {
        match (by_entity, by_sub_entity) {
            (false, false) => Ok(Self::Overall),
            (true, false) => Ok(Self::ByEntity),
            (true, true) => Ok(Self::ByEntityAndSubEntity),
            (false, true) => Err(StatsError::invalid(
                "sub-entity grouping requires entity grouping",
            )),
        }
    }

    pub fn includes_entity(self) -> bool {
        self >= Self::ByEntity
    }

    pub fn includes_sub_entity(self) -> bool {
        self == Self::ByEntityAndSubEntity
    }

    /// Row shape produced by a trend query at this level
    pub fn shape(self) -> ResultShape {
        match self {
            Self::Overall => ResultShape::Overall,
            Self::ByEntity => ResultShape::ByEntity,
            Self::ByEntityAndSubEntity => ResultShape::BySubEntity,
        }
    }
}

/// Column layout of a result row, identified by the tag in column 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Overall,
    ByEntity,
    BySubEntity,
    EntityList,
}

impl ResultShape {
    pub const ALL: [ResultShape; 4] = [
        ResultShape::Overall,
        ResultShape::ByEntity,
        ResultShape::BySubEntity,
        ResultShape::EntityList,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::ByEntity => "entity",
            Self::BySubEntity => "sub_entity",
            Self::EntityList => "entity_list",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| shape.tag() == tag)
    }

    /// Number of columns in a row of this shape, tag included
    pub fn column_count(self) -> usize {
        match self {
            Self::Overall => 8,
            Self::ByEntity => 9,
            Self::BySubEntity => 10,
            Self::EntityList => 3,
        }
    }
}

/// One component of the grouping key, in ORDER BY position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    ResultShape,
    Entity,
    SubEntity,
    ProbeDate,
    Hour,
    MinuteBucket,
}

/// Immutable description of one aggregation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    level: GroupingLevel,
    eval_date: NaiveDate,
    target_attribute: String,
    minute_bucket_size: u32,
    entity_filter: Option<String>,
    sub_entity_filter: Option<String>,
}

impl QuerySpec {
    pub fn level(&self) -> GroupingLevel {
        self.level
    }

    pub fn eval_date(&self) -> NaiveDate {
        self.eval_date
    }

    pub fn target_attribute(&self) -> &str {
        &self.target_attribute
    }

    pub fn minute_bucket_size(&self) -> u32 {
        self.minute_bucket_size
    }

    pub fn entity_filter(&self) -> Option<&str> {
        self.entity_filter.as_deref()
    }

    pub fn sub_entity_filter(&self) -> Option<&str> {
        self.sub_entity_filter.as_deref()
    }

    /// Grouping key in ORDER BY order
    ///
    /// Entity and sub-entity sort NULL first, everything ascending. The
    /// statement's GROUP BY and ORDER BY clauses are both rendered from this.
    pub fn sort_key(&self) -> Vec<SortKey> {
        let mut keys = vec![SortKey::ResultShape];
        if self.level.includes_entity() {
            keys.push(SortKey::Entity);
        }
        if self.level.includes_sub_entity() {
            keys.push(SortKey::SubEntity);
        }
        keys.push(SortKey::ProbeDate);
        keys.push(SortKey::Hour);
        if self.minute_bucket_size > 0 {
            keys.push(SortKey::MinuteBucket);
        }
        keys
    }

    /// Render the aggregate statement for one backend
    pub fn to_statement(&self, schema: &RecorderSchema, dialect: &dyn SqlDialect) -> SqlStatement {
        let shape = self.level.shape();
        let ts = schema.timestamp_column.as_str();
        let date_expr = dialect.date_text(ts);
        let attr = self.target_attribute.as_str();

        let mut columns = vec![
            format!("'{}' AS res_type", shape.tag()),
            format!("{} AS eval_date", date_expr),
            format!("{} AS grp_hour", dialect.hour_of_day(ts)),
            format!(
                "{} AS grp_min",
                dialect.minute_bucket(ts, self.minute_bucket_size)
            ),
        ];
        if self.level.includes_entity() {
            columns.push(schema.entity_column.clone());
        }
        if self.level.includes_sub_entity() {
            columns.push(schema.sub_entity_column.clone());
        }
        columns.push("COUNT(*) AS num_res".to_string());
        columns.push(format!("MIN({}) AS min_res", attr));
        columns.push(format!("MAX({}) AS max_res", attr));
        columns.push(format!("AVG({}) AS avg_res", attr));

        let mut stmt = SqlStatement::new(shape.column_count());
        stmt.push_clause(&format!("SELECT {}", columns.join(", ")));
        stmt.push_clause(&format!("FROM {}", schema.table));
        stmt.push_clause(&format!(
            "WHERE {} = {}",
            date_expr,
            dialect.placeholder(1)
        ));
        stmt.push_param(SqlParam::Text(date_param(self.eval_date)));

        if let Some(entity) = &self.entity_filter {
            stmt.push_clause(&format!(
                "AND {} = {}",
                schema.entity_column,
                dialect.placeholder(stmt.params().len() + 1)
            ));
            stmt.push_param(SqlParam::Text(entity.clone()));
        }
        if let Some(sub_entity) = &self.sub_entity_filter {
            stmt.push_clause(&format!(
                "AND {} = {}",
                schema.sub_entity_column,
                dialect.placeholder(stmt.params().len() + 1)
            ));
            stmt.push_param(SqlParam::Text(sub_entity.clone()));
        }

        let keys = self.sort_key();
        let group_by: Vec<String> = keys.iter().map(|k| group_term(*k, schema)).collect();
        let order_by: Vec<String> = keys
            .iter()
            .map(|k| order_term(*k, schema, dialect))
            .collect();
        stmt.push_clause(&format!("GROUP BY {}", group_by.join(", ")));
        stmt.push_clause(&format!("ORDER BY {}", order_by.join(", ")));
        stmt
    }
}

/// Builder for [`QuerySpec`]; validation happens in [`QuerySpecBuilder::build`]
#[derive(Debug, Clone)]
pub struct QuerySpecBuilder {
    level: GroupingLevel,
    eval_date: NaiveDate,
    target_attribute: Option<String>,
    minute_bucket_size: u32,
    entity_filter: Option<String>,
    sub_entity_filter: Option<String>,
}

impl QuerySpecBuilder {
    pub fn new(level: GroupingLevel, eval_date: NaiveDate) -> Self {
        Self {
            level,
            eval_date,
            target_attribute: None,
            minute_bucket_size: 0,
            entity_filter: None,
            sub_entity_filter: None,
        }
    }

    pub fn target_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.target_attribute = Some(attribute.into());
        self
    }

    /// Sub-hour bucket size in minutes, 0 disables minute grouping
    pub fn minute_bucket_size(mut self, minutes: u32) -> Self {
        self.minute_bucket_size = minutes;
        self
    }

    pub fn entity_filter(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_filter = Some(entity_id.into());
        self
    }

    pub fn sub_entity_filter(mut self, sub_entity_id: impl Into<String>) -> Self {
        self.sub_entity_filter = Some(sub_entity_id.into());
        self
    }

    pub fn build(self, schema: &RecorderSchema) -> Result<QuerySpec, StatsError> {
        let target_attribute = match &self.target_attribute {
            Some(requested) => schema.check_attribute(requested)?.to_string(),
            None => schema.check_attribute(&schema.default_attribute)?.to_string(),
        };

        if self.minute_bucket_size > MAX_MINUTE_BUCKET_SIZE {
            return Err(StatsError::invalid(format!(
                "minute bucket size {} exceeds {}",
                self.minute_bucket_size, MAX_MINUTE_BUCKET_SIZE
            )));
        }
        if self.entity_filter.is_some() && !self.level.includes_entity() {
            return Err(StatsError::invalid(
                "entity filter requires entity grouping",
            ));
        }
        if self.sub_entity_filter.is_some() && !self.level.includes_sub_entity() {
            return Err(StatsError::invalid(
                "sub-entity filter requires sub-entity grouping",
            ));
        }

        Ok(QuerySpec {
            level: self.level,
            eval_date: self.eval_date,
            target_attribute,
            minute_bucket_size: self.minute_bucket_size,
            entity_filter: self.entity_filter,
            sub_entity_filter: self.sub_entity_filter,
        })
    }
}

/// Distinct entities observed on a date, ordered by identifier
pub fn entity_list_statement(
    eval_date: NaiveDate,
    schema: &RecorderSchema,
    dialect: &dyn SqlDialect,
) -> SqlStatement {
    let date_expr = dialect.date_text(&schema.timestamp_column);
    let entity = schema.entity_column.as_str();

    let mut stmt = SqlStatement::new(ResultShape::EntityList.column_count());
    stmt.push_clause(&format!(
        "SELECT '{}' AS res_type, {} AS probe_date, {}",
        ResultShape::EntityList.tag(),
        date_expr,
        entity
    ));
    stmt.push_clause(&format!("FROM {}", schema.table));
    stmt.push_clause(&format!(
        "WHERE {} = {}",
        date_expr,
        dialect.placeholder(1)
    ));
    stmt.push_clause(&format!("GROUP BY res_type, probe_date, {}", entity));
    stmt.push_clause(&format!(
        "ORDER BY {}",
        dialect.order_by_with_nulls(entity, false, false)
    ));
    stmt.push_param(SqlParam::Text(date_param(eval_date)));
    stmt
}

fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn group_term(key: SortKey, schema: &RecorderSchema) -> String {
    match key {
        SortKey::ResultShape => "res_type".to_string(),
        SortKey::Entity => schema.entity_column.clone(),
        SortKey::SubEntity => schema.sub_entity_column.clone(),
        SortKey::ProbeDate => "eval_date".to_string(),
        SortKey::Hour => "grp_hour".to_string(),
        SortKey::MinuteBucket => "grp_min".to_string(),
    }
}

fn order_term(key: SortKey, schema: &RecorderSchema, dialect: &dyn SqlDialect) -> String {
    match key {
        SortKey::Entity => dialect.order_by_with_nulls(&schema.entity_column, false, false),
        SortKey::SubEntity => {
            dialect.order_by_with_nulls(&schema.sub_entity_column, false, false)
        }
        other => group_term(other, schema),
    }
}
