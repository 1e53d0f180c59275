//! Well-known locations.
//!
//! | Purpose | Source | readall path |
//! |---------|--------|--------------|
//! | Config | `$XDG_CONFIG_HOME` | `$XDG_CONFIG_HOME/readall/config.toml` |
//! | Library | `$HOMEBREW_LIBRARY` | first existing of [`LIBRARY_CANDIDATES`] |

use std::path::{Path, PathBuf};

use directories::BaseDirs;

/// Homebrew library locations, in the order they are tried.
pub const LIBRARY_CANDIDATES: [&str; 3] = [
    "/opt/homebrew/Library",
    "/usr/local/Homebrew/Library",
    "/home/linuxbrew/.linuxbrew/Homebrew/Library",
];

/// Get the config directory.
///
/// Uses `$XDG_CONFIG_HOME/readall` or falls back to `~/.config/readall`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".config"))
        .join("readall")
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// The first library candidate that is a directory.
pub fn default_library() -> Option<PathBuf> {
    LIBRARY_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_dir())
        .map(Path::to_path_buf)
}

fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
