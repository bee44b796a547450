//! Time-bucketed statistics over the recorder fact table
//!
//! - `query` - Query Spec Builder (grouping level to aggregate statement)
//! - `decode` - Row Decoder (tagged raw rows to records)
//! - `generator` - Statistics Generator (build, execute, decode)
//! - `view` - Regrouping/View Engine (records to chart series)
//! - `schema` - Table and column names, attribute allow-list
//!
//! Data flows builder → executor → decoder → generator → view. Generators
//! and views are created per request and share no state.

mod decode;
pub mod error;
pub mod generator;
pub mod query;
pub mod record;
pub mod schema;
pub mod view;

pub use decode::{decode_row, decode_rows};
pub use error::StatsError;
pub use generator::{StatisticsGenerator, TrendOptions};
pub use query::{GroupingLevel, QuerySpec, QuerySpecBuilder, ResultShape, SortKey};
pub use record::{StatValue, StatisticRecord};
pub use schema::RecorderSchema;
pub use view::{Aggregate, ChartGroups, ChartSeries, DataSet, StatisticsView, ViewSnapshot};
