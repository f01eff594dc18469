use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PORT,
    DEFAULT_QUERY_TIMEOUT_MS, DEFAULT_SEED_ROWS,
};
use super::storage::default_database_path;

// =============================================================================
// Database Backend Enum
// =============================================================================

/// Row store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    Memory,
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseBackend::Sqlite => write!(f, "sqlite"),
            DatabaseBackend::Memory => write!(f, "memory"),
        }
    }
}

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Query configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub case_sensitive: Option<bool>,
}

/// Database configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    /// Row store backend: sqlite (default) or memory
    pub backend: Option<DatabaseBackend>,
    /// SQLite database file
    pub path: Option<String>,
    /// Demo rows seeded into an empty table
    pub seed_rows: Option<u32>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub query: Option<QueryFileConfig>,
    pub database: Option<DatabaseFileConfig>,
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
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
        }

        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            if query.default_page_size.is_some() {
                current.default_page_size = query.default_page_size;
            }
            if query.max_page_size.is_some() {
                current.max_page_size = query.max_page_size;
            }
            if query.timeout_ms.is_some() {
                current.timeout_ms = query.timeout_ms;
            }
            if query.case_sensitive.is_some() {
                current.case_sensitive = query.case_sensitive;
            }
        }

        if let Some(database) = other.database {
            let current = self
                .database
                .get_or_insert_with(DatabaseFileConfig::default);
            if database.backend.is_some() {
                tracing::trace!(backend = ?database.backend, "Merging database.backend");
                current.backend = database.backend;
            }
            if database.path.is_some() {
                current.path = database.path;
            }
            if database.seed_rows.is_some() {
                current.seed_rows = database.seed_rows;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub timeout_ms: u64,
    pub case_sensitive: bool,
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub path: PathBuf,
    pub seed_rows: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub query: QueryConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.gridline/gridline.json)
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

        let file_server = file_config.server.unwrap_or_default();
        let file_query = file_config.query.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();

        // Layer configs: defaults -> file config -> CLI/env overrides
        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let query = QueryConfig {
            default_page_size: cli
                .default_page_size
                .or(file_query.default_page_size)
                .unwrap_or(gridline::query::DEFAULT_PAGE_SIZE),
            max_page_size: cli
                .max_page_size
                .or(file_query.max_page_size)
                .unwrap_or(DEFAULT_MAX_PAGE_SIZE),
            timeout_ms: cli
                .query_timeout_ms
                .or(file_query.timeout_ms)
                .unwrap_or(DEFAULT_QUERY_TIMEOUT_MS),
            case_sensitive: cli
                .case_sensitive
                .or(file_query.case_sensitive)
                .unwrap_or(false),
        };

        let database = DatabaseConfig {
            backend: cli
                .database_backend
                .or(file_database.backend)
                .unwrap_or_default(),
            path: cli
                .database_path
                .as_ref()
                .map(|p| expand_path(&p.to_string_lossy()))
                .or_else(|| file_database.path.as_deref().map(expand_path))
                .unwrap_or_else(default_database_path),
            seed_rows: cli
                .seed_rows
                .or(file_database.seed_rows)
                .unwrap_or(DEFAULT_SEED_ROWS),
        };

        let config = Self {
            server,
            query,
            database,
        };
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            backend = %config.database.backend,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.query.max_page_size == 0 {
            anyhow::bail!("Configuration error: query.max_page_size must be greater than 0");
        }

        if self.query.default_page_size == 0
            || self.query.default_page_size > self.query.max_page_size
        {
            anyhow::bail!(
                "Configuration error: query.default_page_size ({}) must be between 1 and query.max_page_size ({})",
                self.query.default_page_size,
                self.query.max_page_size
            );
        }

        if self.query.timeout_ms == 0 {
            anyhow::bail!("Configuration error: query.timeout_ms must be greater than 0");
        }

        Ok(())
    }
}

/// Get the profile config path (~/.gridline/gridline.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
