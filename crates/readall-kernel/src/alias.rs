//! Alias resolution.
//!
//! An alias is an entry of a tap's `Aliases/` directory, normally a symlink
//! to one of the tap's definitions. Each entry is judged on its own; one
//! broken alias never hides another.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::outcome::{AliasDefect, Diagnostic};
use crate::tap::{AliasEntry, DEFINITION_EXT, Tap};
use crate::vfs::{Filesystem, normalize};

static PACKAGE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9@+._-]*$").ok());

/// Is `name` usable as a package identifier?
pub fn is_valid_package_name(name: &str) -> bool {
    let ext = format!(".{DEFINITION_EXT}");
    !name.ends_with(&ext) && PACKAGE_NAME.as_ref().is_some_and(|re| re.is_match(name))
}

/// Where an alias points once its recorded target is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// A library-relative path.
    Inside(PathBuf),
    /// Somewhere the library cannot see.
    Outside,
}

/// Resolves a tap's aliases against its definitions.
#[derive(Clone)]
pub struct AliasResolver {
    fs: Arc<dyn Filesystem>,
}

impl AliasResolver {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    /// One diagnostic per broken alias, in alias order.
    pub async fn resolve(&self, tap: &Tap) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for entry in &tap.aliases {
            if let Some(defect) = self.check_entry(tap, entry).await {
                tracing::debug!(tap = %tap.id, alias = %entry.name, ?defect, "broken alias");
                diagnostics.push(Diagnostic::broken_alias(
                    &tap.id,
                    &entry.name,
                    defect,
                    entry.target.clone(),
                ));
            }
        }
        tracing::debug!(
            tap = %tap.id,
            aliases = tap.aliases.len(),
            broken = diagnostics.len(),
            "resolved aliases"
        );
        diagnostics
    }

    /// The first defect of a single alias, if it has one.
    pub async fn check_entry(&self, tap: &Tap, entry: &AliasEntry) -> Option<AliasDefect> {
        if !is_valid_package_name(&entry.name) {
            return Some(AliasDefect::MalformedName);
        }
        let Some(recorded) = &entry.target else {
            return Some(AliasDefect::NotSymlink);
        };
        if tap.definition_named(&entry.name).is_some() {
            return Some(AliasDefect::ShadowsDefinition);
        }

        let path = match self.interpret(&tap.alias_dir(), recorded) {
            Target::Inside(path) => path,
            Target::Outside => return Some(AliasDefect::CrossTapTarget),
        };
        if !self.fs.exists(&path).await {
            return Some(AliasDefect::DanglingTarget);
        }
        if !path.starts_with(&tap.definition_dir) {
            return Some(AliasDefect::CrossTapTarget);
        }
        if !tap.has_definition_at(&path) {
            return Some(AliasDefect::NotDefinition);
        }
        None
    }

    fn interpret(&self, alias_dir: &Path, recorded: &Path) -> Target {
        let resolved = if recorded.is_absolute() {
            self.fs.virtual_path(recorded).and_then(|p| normalize(&p))
        } else {
            normalize(&alias_dir.join(recorded))
        };
        resolved.map_or(Target::Outside, Target::Inside)
    }
}
