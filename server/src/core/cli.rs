use clap::{Parser, Subcommand};

use std::path::PathBuf;

use chrono::NaiveDate;

use super::config::RecorderBackend;
use super::constants::{ENV_CONFIG, ENV_DB, ENV_DB_BACKEND, ENV_DEBUG, ENV_HOST, ENV_PORT};

#[derive(Parser)]
#[command(name = "iot-stats")]
#[command(version, about = "Time-bucketed statistics for IoT recorder data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug mode (verbose query logging)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Path to the recorder database file
    #[arg(long, global = true, env = ENV_DB)]
    pub db: Option<PathBuf>,

    /// Recorder database backend (sqlite or duckdb)
    #[arg(long, global = true, env = ENV_DB_BACKEND, value_parser = parse_recorder_backend)]
    pub db_backend: Option<RecorderBackend>,
}

/// Parse recorder backend from CLI/env string
fn parse_recorder_backend(s: &str) -> Result<RecorderBackend, String> {
    match s.to_lowercase().as_str() {
        "sqlite" | "sqlite3" => Ok(RecorderBackend::Sqlite),
        "duckdb" => Ok(RecorderBackend::Duckdb),
        _ => Err(format!(
            "Invalid recorder backend '{}'. Valid options: sqlite, duckdb",
            s
        )),
    }
}

/// Parse a calendar day given as YYYY-MM-DD
fn parse_report_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}' (expected YYYY-MM-DD): {}", s, e))
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the dashboard API server (default command)
    Serve,
    /// Compute statistics for one day and print every view as JSON
    Report {
        /// Day to evaluate (YYYY-MM-DD)
        #[arg(long, short = 'd', value_parser = parse_report_date)]
        date: NaiveDate,

        /// Break the trend down per device
        #[arg(long)]
        by_entity: bool,

        /// Break the trend down per device channel (requires --by-entity)
        #[arg(long, requires = "by_entity")]
        by_sub_entity: bool,

        /// Report the channels of this device only
        #[arg(long, short = 'e', conflicts_with_all = ["by_entity", "by_sub_entity"])]
        entity: Option<String>,

        /// Minute bucket size (0 = hourly)
        #[arg(long, short = 'm', default_value_t = 0)]
        minutes: u32,

        /// Attribute to aggregate (must be allow-listed)
        #[arg(long, short = 'a')]
        attribute: Option<String>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub db_backend: Option<RecorderBackend>,
}

impl Cli {
    fn split(self) -> (CliConfig, Option<Commands>) {
        let config = CliConfig {
            host: self.host,
            port: self.port,
            debug: self.debug,
            config: self.config,
            db: self.db,
            db_backend: self.db_backend,
        };
        (config, self.command)
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    Cli::parse().split()
}
