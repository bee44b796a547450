//! Data-layer types shared by the recorder backends and the statistics domain

mod statement;

pub use statement::{RawRow, RawValue, SqlParam, SqlStatement};
