//! IoT Stats server library
//!
//! Time-bucketed statistics over an IoT message recorder database,
//! served as chart-ready JSON.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
