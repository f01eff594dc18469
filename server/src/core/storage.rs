//! Data directory resolution
//!
//! Resolution order:
//! 1. `GRIDLINE_DATA_DIR` environment variable
//! 2. Platform data directory (e.g. `~/.local/share/gridline`)
//! 3. `./.gridline` in the current directory

use std::path::PathBuf;

use directories::ProjectDirs;

use super::constants::{APP_DOT_FOLDER, APP_NAME, ENV_DATA_DIR, SQLITE_DB_FILENAME};
use crate::utils::file::expand_path;

pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return expand_path(&dir);
    }

    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
        return proj_dirs.data_dir().to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.join(APP_DOT_FOLDER)
}

/// Default SQLite file inside the data directory
pub fn default_database_path() -> PathBuf {
    resolve_data_dir().join(SQLITE_DB_FILENAME)
}
