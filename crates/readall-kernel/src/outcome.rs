//! Validation outcomes and the diagnostics they carry.
//!
//! Every problem readall finds is a [`Diagnostic`] value, never an early
//! return. Diagnostics are grouped per checked unit (one file, one tap) into
//! a [`ValidationOutcome`].

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::tap::TapId;

/// What a [`ValidationOutcome`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    File,
    Tap,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::File => f.write_str("file"),
            Scope::Tap => f.write_str("tap"),
        }
    }
}

/// Why an alias is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasDefect {
    /// The link target does not exist.
    DanglingTarget,
    /// The target exists but outside this tap's definition directory.
    CrossTapTarget,
    /// The target is inside the definition directory but is not a definition.
    NotDefinition,
    /// The alias name is not a valid package name.
    MalformedName,
    /// The alias record is not a symlink.
    NotSymlink,
    /// A definition with the same name exists, so the alias is unreachable.
    ShadowsDefinition,
}

impl AliasDefect {
    pub fn describe(self) -> &'static str {
        match self {
            AliasDefect::DanglingTarget => "target does not exist",
            AliasDefect::CrossTapTarget => "target is outside the tap's definitions",
            AliasDefect::NotDefinition => "target is not a definition file",
            AliasDefect::MalformedName => "name is not a valid package name",
            AliasDefect::NotSymlink => "alias is not a symlink",
            AliasDefect::ShadowsDefinition => "a definition with the same name exists",
        }
    }
}

/// A single reportable problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The syntax oracle rejected a file.
    #[error("{}{}: {message}", .file.display(), line_suffix(.line))]
    Syntax {
        file: PathBuf,
        line: Option<u32>,
        message: String,
    },

    /// A candidate file (or directory beneath the scan root) could not be read.
    #[error("unreadable {}: {cause}", .file.display())]
    UnreadableFile { file: PathBuf, cause: String },

    /// The file was read but the oracle could not be run on it.
    #[error("could not check {}: {cause}", .file.display())]
    CheckFailed { file: PathBuf, cause: String },

    /// An alias in a tap does not resolve to one of its definitions.
    #[error("broken alias {tap}/{alias}: {} ({})", .reason.describe(), display_target(.target))]
    BrokenAlias {
        tap: TapId,
        alias: String,
        reason: AliasDefect,
        target: Option<PathBuf>,
    },

    /// A requested tap has no definition files.
    #[error("tap {tap} has no definitions")]
    EmptyTap { tap: TapId },
}

fn line_suffix(line: &Option<u32>) -> String {
    line.map(|l| format!(":{l}")).unwrap_or_default()
}

fn display_target(target: &Option<PathBuf>) -> String {
    match target {
        Some(path) => format!("-> {}", path.display()),
        None => "no link target".to_string(),
    }
}

impl Diagnostic {
    pub fn broken_alias(
        tap: &TapId,
        alias: impl Into<String>,
        reason: AliasDefect,
        target: Option<PathBuf>,
    ) -> Self {
        Diagnostic::BrokenAlias {
            tap: tap.clone(),
            alias: alias.into(),
            reason,
            target,
        }
    }

    /// The alias defect, if this is a broken-alias diagnostic.
    pub fn alias_defect(&self) -> Option<AliasDefect> {
        match self {
            Diagnostic::BrokenAlias { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Result of checking one unit.
///
/// `ok` is derived from the diagnostics at construction: a unit with any
/// diagnostic has failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub scope: Scope,
    pub subject: String,
    pub ok: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationOutcome {
    pub fn new(scope: Scope, subject: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            scope,
            subject: subject.into(),
            ok: diagnostics.is_empty(),
            diagnostics,
        }
    }

    /// Outcome for a single file.
    pub fn file(path: &std::path::Path, diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(Scope::File, path.display().to_string(), diagnostics)
    }

    /// Outcome for a whole tap.
    pub fn tap(tap: &TapId, diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(Scope::Tap, tap.to_string(), diagnostics)
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_diagnostic_names_file_and_line() {
        let d = Diagnostic::Syntax {
            file: PathBuf::from("Homebrew/bad.rb"),
            line: Some(3),
            message: "syntax error, unexpected end-of-input".into(),
        };
        assert_eq!(
            d.to_string(),
            "Homebrew/bad.rb:3: syntax error, unexpected end-of-input"
        );
    }

    #[test]
    fn broken_alias_mentions_reason_and_target() {
        let tap: TapId = "foo/bar".parse().unwrap();
        let d = Diagnostic::broken_alias(
            &tap,
            "baz",
            AliasDefect::DanglingTarget,
            Some(PathBuf::from("../Formula/gone.rb")),
        );
        let text = d.to_string();
        assert!(text.contains("foo/bar/baz"), "{text}");
        assert!(text.contains("does not exist"), "{text}");
        assert!(text.contains("../Formula/gone.rb"), "{text}");
        assert_eq!(d.alias_defect(), Some(AliasDefect::DanglingTarget));
    }

    #[test]
    fn outcome_ok_follows_diagnostics() {
        let clean = ValidationOutcome::file(std::path::Path::new("a.rb"), vec![]);
        assert!(clean.is_ok());

        let tap: TapId = "core".parse().unwrap();
        let dirty = ValidationOutcome::tap(&tap, vec![Diagnostic::EmptyTap { tap: tap.clone() }]);
        assert!(!dirty.is_ok());
        assert_eq!(dirty.subject, "homebrew/core");
    }

    #[test]
    fn diagnostics_serialize_with_kind_tag() {
        let d = Diagnostic::UnreadableFile {
            file: PathBuf::from("x.rb"),
            cause: "permission denied".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "unreadable_file");
        assert_eq!(json["file"], "x.rb");
    }
}
