//! Configuration.
//!
//! Layers, lowest precedence first: built-in defaults, the config file
//! (`$XDG_CONFIG_HOME/readall/config.toml`), the environment, then whatever
//! the caller overlays (command-line flags).
//!
//! ```toml
//! library = "/opt/homebrew/Library"
//! ruby = "/usr/bin/ruby"
//! jobs = 4
//! pattern = "**/*.rb"
//! exclude = ["vendor", "cask"]
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReadallError;
use crate::paths;
use crate::scanner::ScanSettings;

pub const ENV_LIBRARY: &str = "HOMEBREW_LIBRARY";
pub const ENV_RUBY: &str = "HOMEBREW_RUBY_PATH";
pub const ENV_JOBS: &str = "READALL_JOBS";

/// Every setting is optional; unset ones fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadallConfig {
    /// Homebrew library directory (holds `Homebrew/` and `Taps/`).
    pub library: Option<PathBuf>,
    /// Ruby interpreter used as the syntax oracle.
    pub ruby: Option<PathBuf>,
    /// Concurrent checks.
    pub jobs: Option<usize>,
    /// Scan glob, relative to the scan root.
    pub pattern: Option<String>,
    /// Directory names never scanned.
    pub exclude: Option<Vec<String>>,
}

impl ReadallConfig {
    /// Defaults, then the user's config file, then the process environment.
    pub fn load() -> Result<Self, ReadallError> {
        Self::load_with(&paths::config_file(), |key| std::env::var(key).ok())
    }

    /// Like [`ReadallConfig::load`] with an explicit file and environment.
    pub fn load_with(
        file: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ReadallError> {
        Ok(Self::from_file(file)?.overlay(Self::from_env(env)))
    }

    /// A missing file is an empty config; a malformed one is an error.
    pub fn from_file(path: &Path) -> Result<Self, ReadallError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ReadallError::Config {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };
        let config = Self::from_toml(&text).map_err(|message| ReadallError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let jobs = non_empty(ENV_JOBS).and_then(|v| match v.trim().parse() {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(value = %v, error = %e, "ignoring {ENV_JOBS}");
                None
            }
        });
        Self {
            library: non_empty(ENV_LIBRARY).map(PathBuf::from),
            ruby: non_empty(ENV_RUBY).map(PathBuf::from),
            jobs,
            pattern: None,
            exclude: None,
        }
    }

    /// `other`'s settings win where present.
    pub fn overlay(self, other: ReadallConfig) -> Self {
        Self {
            library: other.library.or(self.library),
            ruby: other.ruby.or(self.ruby),
            jobs: other.jobs.or(self.jobs),
            pattern: other.pattern.or(self.pattern),
            exclude: other.exclude.or(self.exclude),
        }
    }

    /// The configured library, else the first conventional one that exists.
    pub fn library_dir(&self) -> Option<PathBuf> {
        self.library.clone().or_else(paths::default_library)
    }

    /// Concurrency bound, at least 1.
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or(1).max(1)
    }

    pub fn scan_settings(&self) -> ScanSettings {
        let defaults = ScanSettings::default();
        ScanSettings {
            root: defaults.root,
            pattern: self.pattern.clone().unwrap_or(defaults.pattern),
            exclude: self.exclude.clone().unwrap_or(defaults.exclude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_every_field() {
        let config = ReadallConfig::from_toml(
            r#"
            library = "/lib"
            ruby = "/bin/ruby"
            jobs = 3
            pattern = "**/*.rake"
            exclude = ["vendor"]
            "#,
        )
        .unwrap();
        assert_eq!(config.library, Some(PathBuf::from("/lib")));
        assert_eq!(config.jobs(), 3);
        assert_eq!(config.scan_settings().pattern, "**/*.rake");
        assert_eq!(config.scan_settings().exclude, vec!["vendor"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ReadallConfig::from_toml("colour = true").is_err());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = ReadallConfig::from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ReadallConfig::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "jobs = \"many\"").unwrap();
        let err = ReadallConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ReadallError::Config { .. }), "{err}");
    }

    #[test]
    fn environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "library = \"/from/file\"\njobs = 2\n").unwrap();

        let config = ReadallConfig::load_with(
            &path,
            env(&[(ENV_LIBRARY, "/from/env"), (ENV_RUBY, "/opt/ruby")]),
        )
        .unwrap();

        assert_eq!(config.library, Some(PathBuf::from("/from/env")));
        assert_eq!(config.ruby, Some(PathBuf::from("/opt/ruby")));
        assert_eq!(config.jobs(), 2);
    }

    #[test]
    fn bad_jobs_in_environment_is_ignored() {
        let config = ReadallConfig::from_env(env(&[(ENV_JOBS, "lots")]));
        assert_eq!(config.jobs, None);
        assert_eq!(config.jobs(), 1);
    }

    #[test]
    fn zero_jobs_means_one() {
        let config = ReadallConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.jobs(), 1);
    }

    #[test]
    fn defaults_match_scanner() {
        assert_eq!(ReadallConfig::default().scan_settings(), ScanSettings::default());
    }
}
