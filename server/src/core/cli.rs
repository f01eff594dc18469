use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::DatabaseBackend;
use super::constants::{
    ENV_CASE_SENSITIVE, ENV_CONFIG, ENV_DATABASE_BACKEND, ENV_DATABASE_PATH,
    ENV_DEFAULT_PAGE_SIZE, ENV_HOST, ENV_MAX_PAGE_SIZE, ENV_PORT, ENV_QUERY_TIMEOUT_MS,
    ENV_SEED_ROWS,
};

#[derive(Parser)]
#[command(name = "gridline")]
#[command(version, about = "Typed table filtering and pagination server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Query options
    /// Page size used when a request does not name one
    #[arg(long, global = true, env = ENV_DEFAULT_PAGE_SIZE)]
    pub default_page_size: Option<u32>,

    /// Largest page size a request may ask for
    #[arg(long, global = true, env = ENV_MAX_PAGE_SIZE)]
    pub max_page_size: Option<u32>,

    /// Timeout for each store query in milliseconds
    #[arg(long, global = true, env = ENV_QUERY_TIMEOUT_MS)]
    pub query_timeout_ms: Option<u64>,

    /// Match text filters case-sensitively
    #[arg(long, global = true, env = ENV_CASE_SENSITIVE)]
    pub case_sensitive: Option<bool>,

    // Database options
    /// Row store backend (sqlite or memory)
    #[arg(long, global = true, env = ENV_DATABASE_BACKEND, value_parser = parse_database_backend)]
    pub database_backend: Option<DatabaseBackend>,

    /// SQLite database file
    #[arg(long, global = true, env = ENV_DATABASE_PATH)]
    pub database_path: Option<PathBuf>,

    /// Demo rows seeded into an empty table
    #[arg(long, global = true, env = ENV_SEED_ROWS)]
    pub seed_rows: Option<u32>,
}

/// Parse database backend from CLI/env string
fn parse_database_backend(s: &str) -> Result<DatabaseBackend, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(DatabaseBackend::Sqlite),
        "memory" => Ok(DatabaseBackend::Memory),
        _ => Err(format!(
            "Invalid database backend '{}'. Valid options: sqlite, memory",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Create and seed the SQLite database, then exit
    Seed,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
    pub query_timeout_ms: Option<u64>,
    pub case_sensitive: Option<bool>,
    pub database_backend: Option<DatabaseBackend>,
    pub database_path: Option<PathBuf>,
    pub seed_rows: Option<u32>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        default_page_size: cli.default_page_size,
        max_page_size: cli.max_page_size,
        query_timeout_ms: cli.query_timeout_ms,
        case_sensitive: cli.case_sensitive,
        database_backend: cli.database_backend,
        database_path: cli.database_path,
        seed_rows: cli.seed_rows,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database_backend() {
        assert_eq!(parse_database_backend("SQLite"), Ok(DatabaseBackend::Sqlite));
        assert_eq!(parse_database_backend("memory"), Ok(DatabaseBackend::Memory));
        assert!(parse_database_backend("postgres").is_err());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "gridline",
            "--port",
            "8080",
            "--database-backend",
            "memory",
            "--case-sensitive",
            "true",
            "seed",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.database_backend, Some(DatabaseBackend::Memory));
        assert_eq!(cli.case_sensitive, Some(true));
        assert!(matches!(cli.command, Some(Commands::Seed)));
    }
}
