//! Path filters used while walking.

use std::path::{Component, Path};

use ignore::overrides::{Override, OverrideBuilder};

use crate::WalkerError;

/// Whitelist glob over root-relative paths.
///
/// Patterns follow gitignore syntax: `**/*.rb` matches Ruby files at any
/// depth, `*.rb` matches a basename anywhere, `cmd/*.rb` is anchored.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    pattern: String,
    matcher: Override,
}

impl GlobFilter {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self, WalkerError> {
        let mut builder = OverrideBuilder::new("");
        builder
            .add(pattern)
            .map_err(|e| WalkerError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        let matcher = builder.build().map_err(|e| WalkerError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Does this root-relative file path match?
    pub fn matches(&self, relative: &Path) -> bool {
        self.matcher.matched(relative, false).is_whitelist()
    }
}

/// Rejects paths that sit under a directory with one of the given names.
///
/// Only directory segments count: `vendor/b.rb` is excluded, a file that
/// happens to be called `vendor` is not.
#[derive(Debug, Clone, Default)]
pub struct SegmentExclusion {
    segments: Vec<String>,
}

impl SegmentExclusion {
    /// Build an exclusion from directory names.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The excluded directory names.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Is this directory (root-relative) excluded, including its own name?
    pub fn excludes_dir(&self, relative_dir: &Path) -> bool {
        relative_dir.components().any(|c| self.is_excluded(c))
    }

    /// Is this file (root-relative) under an excluded directory?
    pub fn excludes(&self, relative_file: &Path) -> bool {
        relative_file
            .parent()
            .is_some_and(|dir| self.excludes_dir(dir))
    }

    fn is_excluded(&self, component: Component<'_>) -> bool {
        match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                self.segments.iter().any(|s| *s == name)
            }
            _ => false,
        }
    }
}
