// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "IoT Stats";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".iot-stats";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "iot-stats.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "IOT_STATS_CONFIG";

// =============================================================================
// Environment Variables - Debug
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "IOT_STATS_DEBUG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "IOT_STATS_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "IOT_STATS_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "IOT_STATS_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Graceful shutdown deadline
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Environment Variables - Recorder Database
// =============================================================================

/// Environment variable for the recorder database path
pub const ENV_DB: &str = "IOT_STATS_DB";

/// Environment variable for the recorder database backend (sqlite or duckdb)
pub const ENV_DB_BACKEND: &str = "IOT_STATS_DB_BACKEND";

// =============================================================================
// Recorder Database Defaults
// =============================================================================

/// Default recorder database file, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "iot-recorder.db";

/// SQLite connection pool size (read-only, queries are short)
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout while the recorder is writing
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// Upper bound for a single DuckDB statistics query
pub const DUCKDB_QUERY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Recorder Schema Defaults
// =============================================================================

/// Fact table holding one row per probe reading
pub const DEFAULT_FACT_TABLE: &str = "iot_recorder_input_probe";

/// Reading timestamp column
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "probe_time";

/// Publishing device column
pub const DEFAULT_ENTITY_COLUMN: &str = "device_id";

/// Device channel column
pub const DEFAULT_SUB_ENTITY_COLUMN: &str = "channel_no";

/// Numeric attribute aggregated when none is requested
pub const DEFAULT_TARGET_ATTRIBUTE: &str = "value";

/// Display prefix for sub-entity labels
pub const DEFAULT_SUB_ENTITY_PREFIX: &str = "Channel";

// =============================================================================
// Statistics
// =============================================================================

/// Largest accepted minute bucket (one bucket per hour)
pub const MAX_MINUTE_BUCKET_SIZE: u32 = 60;

/// Minute bucket used by the per-device detail page
pub const DETAIL_MINUTE_BUCKET_SIZE: u32 = 5;

/// Path format of a day in dashboard URLs
pub const DAY_PATH_FORMAT: &str = "%Y%m%d";

/// Format of the `ev_day` query parameter
pub const EV_DAY_FORMAT: &str = "%d.%m.%Y";
