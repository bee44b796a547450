//! Domain logic for recorder statistics
//!
//! - `statistics` - Aggregate queries, row decoding and chart regrouping

pub mod statistics;

pub use statistics::{StatisticsGenerator, StatisticsView, StatsError};
