//! Path helpers for config and database locations

use std::path::PathBuf;

/// Expand a user-supplied path to an absolute one
///
/// `~` and `~/...` resolve against the home directory; relative paths resolve
/// against the current directory. Components are kept as written, so
/// `./data/../gridline.db` is not canonicalized.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if path.is_empty() {
        return cwd();
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => dirs::home_dir()
            .map(|home| home.join(&rest[1..]))
            .unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        cwd().join(expanded)
    } else {
        expanded
    }
}
