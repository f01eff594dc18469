// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Gridline";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "gridline";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".gridline";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "gridline.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "GRIDLINE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "GRIDLINE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "GRIDLINE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "GRIDLINE_LOG";

/// Environment variable for log output format (`compact` or `json`)
pub const ENV_LOG_FORMAT: &str = "GRIDLINE_LOG_FORMAT";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Default request body limit (1MB); every endpoint is a GET
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Graceful shutdown timeout for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Environment Variables - Query
// =============================================================================

pub const ENV_DEFAULT_PAGE_SIZE: &str = "GRIDLINE_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "GRIDLINE_MAX_PAGE_SIZE";
pub const ENV_QUERY_TIMEOUT_MS: &str = "GRIDLINE_QUERY_TIMEOUT_MS";
pub const ENV_CASE_SENSITIVE: &str = "GRIDLINE_CASE_SENSITIVE";

// =============================================================================
// Query Defaults
// =============================================================================

/// Maximum rows per page
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 500;

/// Per-query timeout for store calls
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;

// =============================================================================
// Environment Variables - Database
// =============================================================================

pub const ENV_DATABASE_BACKEND: &str = "GRIDLINE_DATABASE_BACKEND";
pub const ENV_DATABASE_PATH: &str = "GRIDLINE_DATABASE_PATH";
pub const ENV_SEED_ROWS: &str = "GRIDLINE_SEED_ROWS";

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "GRIDLINE_DATA_DIR";

/// Demo rows inserted into an empty table
pub const DEFAULT_SEED_ROWS: u32 = 200;

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "gridline.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// WAL auto-checkpoint threshold in pages
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// Interval between explicit WAL checkpoints
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;
