use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::statistics::RecorderSchema;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_DB_PATH, DEFAULT_HOST, DEFAULT_PORT,
};

// =============================================================================
// Recorder Backend Enum (SQLite or DuckDB)
// =============================================================================

/// Database engine holding the recorder fact table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderBackend {
    #[default]
    Sqlite,
    Duckdb,
}

impl fmt::Display for RecorderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderBackend::Sqlite => write!(f, "sqlite"),
            RecorderBackend::Duckdb => write!(f, "duckdb"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Recorder database section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<String>,
    pub backend: Option<RecorderBackend>,
}

/// Fact table layout section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SchemaFileConfig {
    pub table: Option<String>,
    pub timestamp_column: Option<String>,
    pub entity_column: Option<String>,
    pub sub_entity_column: Option<String>,
    pub attributes: Option<Vec<String>>,
    pub default_attribute: Option<String>,
    pub sub_entity_prefix: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub schema: Option<SchemaFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        if let Some(database) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            if database.path.is_some() {
                tracing::trace!(path = ?database.path, "Merging database.path");
                current.path = database.path;
            }
            if database.backend.is_some() {
                tracing::trace!(backend = ?database.backend, "Merging database.backend");
                current.backend = database.backend;
            }
        }

        if let Some(schema) = other.schema {
            let current = self.schema.get_or_insert_with(SchemaFileConfig::default);
            merge_field(&mut current.table, schema.table);
            merge_field(&mut current.timestamp_column, schema.timestamp_column);
            merge_field(&mut current.entity_column, schema.entity_column);
            merge_field(&mut current.sub_entity_column, schema.sub_entity_column);
            merge_field(&mut current.attributes, schema.attributes);
            merge_field(&mut current.default_attribute, schema.default_attribute);
            merge_field(&mut current.sub_entity_prefix, schema.sub_entity_prefix);
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }
}

fn merge_field<T>(current: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *current = other;
    }
}

impl SchemaFileConfig {
    /// Fill unset names from the built-in recorder layout
    fn into_schema(self) -> RecorderSchema {
        let defaults = RecorderSchema::default();
        let attributes = self.attributes.unwrap_or(defaults.attributes);
        // A custom allow-list without an explicit default uses its first entry
        let default_attribute = self.default_attribute.unwrap_or_else(|| {
            if attributes.contains(&defaults.default_attribute) {
                defaults.default_attribute.clone()
            } else {
                attributes.first().cloned().unwrap_or_default()
            }
        });
        RecorderSchema {
            table: self.table.unwrap_or(defaults.table),
            timestamp_column: self.timestamp_column.unwrap_or(defaults.timestamp_column),
            entity_column: self.entity_column.unwrap_or(defaults.entity_column),
            sub_entity_column: self.sub_entity_column.unwrap_or(defaults.sub_entity_column),
            attributes,
            default_attribute,
            sub_entity_prefix: self.sub_entity_prefix.unwrap_or(defaults.sub_entity_prefix),
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Recorder database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub backend: RecorderBackend,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub schema: RecorderSchema,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.iot-stats/iot-stats.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(cli, file_config)
    }

    /// Layer CLI/env overrides on top of merged file config and defaults
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();
        let file_schema = file_config.schema.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let db_path = cli
            .db
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or(file_database.path)
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let backend = cli
            .db_backend
            .or(file_database.backend)
            .unwrap_or_default();

        let debug = cli.debug || file_config.debug.unwrap_or(false);

        let config = Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                path: if db_path.trim().is_empty() {
                    PathBuf::new()
                } else {
                    expand_path(&db_path)
                },
                backend,
            },
            schema: file_schema.into_schema(),
            debug,
        };

        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            db_path = %config.database.path.display(),
            db_backend = %config.database.backend,
            table = %config.schema.table,
            attributes = ?config.schema.attributes,
            debug = config.debug,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port 0 would bind a random port
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.database.path.as_os_str().is_empty() {
            anyhow::bail!("Configuration error: database.path must not be empty");
        }

        self.schema
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration error: schema: {}", e))?;

        Ok(())
    }
}

/// Get the profile config path (~/.iot-stats/iot-stats.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub(crate) fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
