//! Taps: independently rooted collections of package definitions.
//!
//! A tap `owner/repo` lives at `Taps/<owner>/homebrew-<repo>` in the
//! library. Its definitions are the `*.rb` files of its definition
//! directory (`Formula/`, else `HomebrewFormula/`, else the tap root) and its
//! aliases are the entries of `Aliases/`.
//!
//! A [`Tap`] is a snapshot built from the filesystem for one run and then
//! thrown away.

mod registry;

pub use registry::{TapDirectory, TapListing, TapRegistry};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use readall_glob::{FileWalker, GlobFilter, SegmentExclusion};
use serde::{Serialize, Serializer};

use crate::backend_walker_fs::VfsWalker;
use crate::error::ReadallError;
use crate::outcome::Diagnostic;
use crate::vfs::Filesystem;

/// Directory holding all taps, relative to the library root.
pub const TAPS_DIR: &str = "Taps";

/// Repository prefix every tap directory carries on disk.
pub const REPO_PREFIX: &str = "homebrew-";

/// Alias directory, relative to the tap root.
pub const ALIAS_DIR: &str = "Aliases";

/// Definition directories, in order of preference.
const DEFINITION_DIRS: [&str; 2] = ["Formula", "HomebrewFormula"];

/// Definition file extension.
pub const DEFINITION_EXT: &str = "rb";

/// `owner/repo`, lowercase, without the `homebrew-` prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TapId {
    owner: String,
    repo: String,
}

impl TapId {
    pub fn new(owner: &str, repo: &str) -> Result<Self, ReadallError> {
        let owner = owner.to_ascii_lowercase();
        let repo = repo.to_ascii_lowercase();
        let repo = repo.strip_prefix(REPO_PREFIX).unwrap_or(&repo).to_string();
        let display = format!("{owner}/{repo}");

        for part in [&owner, &repo] {
            if part.is_empty() {
                return Err(ReadallError::InvalidTapName {
                    name: display,
                    reason: "empty owner or repository",
                });
            }
            if part == "." || part == ".." {
                return Err(ReadallError::InvalidTapName {
                    name: display,
                    reason: "path component",
                });
            }
            if !part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                return Err(ReadallError::InvalidTapName {
                    name: display,
                    reason: "unexpected character",
                });
            }
        }
        Ok(Self { owner, repo })
    }

    /// The main Homebrew tap.
    pub fn core() -> Self {
        Self {
            owner: "homebrew".to_string(),
            repo: "core".to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Where this tap lives, relative to the library root.
    pub fn dir(&self) -> PathBuf {
        Path::new(TAPS_DIR)
            .join(&self.owner)
            .join(format!("{REPO_PREFIX}{}", self.repo))
    }
}

impl FromStr for TapId {
    type Err = ReadallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("core") {
            return Ok(Self::core());
        }
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] => Self::new(owner, repo),
            _ => Err(ReadallError::InvalidTapName {
                name: s.to_string(),
                reason: "expected owner/repo",
            }),
        }
    }
}

impl fmt::Display for TapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl Serialize for TapId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A tap the registry knows about: identifier plus root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapRef {
    pub id: TapId,
    pub root: PathBuf,
}

impl TapRef {
    /// The conventional location for `id`.
    pub fn at_default_location(id: TapId) -> Self {
        let root = id.dir();
        Self { id, root }
    }
}

/// A package definition file.
///
/// Content is read on demand through the VFS, so an unreadable definition
/// surfaces as a diagnostic when it is checked rather than at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFile {
    pub path: PathBuf,
    /// Canonical package name: the file stem.
    pub name: String,
}

impl DefinitionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Raw content of the definition.
    pub async fn source(&self, fs: &dyn Filesystem) -> std::io::Result<Vec<u8>> {
        fs.read(&self.path).await
    }
}

/// One record of a tap's alias directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub name: String,
    /// Link target exactly as recorded; `None` if the record is not a link.
    pub target: Option<PathBuf>,
}

impl AliasEntry {
    pub fn link(name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            target: Some(target.into()),
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
        }
    }
}

/// A loaded tap.
#[derive(Debug, Clone)]
pub struct Tap {
    pub id: TapId,
    pub root: PathBuf,
    pub definition_dir: PathBuf,
    pub definitions: Vec<DefinitionFile>,
    pub aliases: Vec<AliasEntry>,
    /// Problems met while enumerating (unlistable directories).
    pub load_problems: Vec<Diagnostic>,
}

impl Tap {
    /// Snapshot a tap from the filesystem.
    ///
    /// Never fails: anything that cannot be listed is kept in
    /// `load_problems` and the rest of the tap is still loaded.
    pub async fn load(fs: &dyn Filesystem, tap: &TapRef) -> Self {
        let mut load_problems = Vec::new();

        let mut definition_dir = tap.root.clone();
        for candidate in DEFINITION_DIRS {
            let dir = tap.root.join(candidate);
            if fs.is_dir(&dir).await {
                definition_dir = dir;
                break;
            }
        }

        let definitions = if definition_dir == tap.root {
            Self::top_level_definitions(fs, &tap.root, &mut load_problems).await
        } else {
            Self::nested_definitions(fs, &definition_dir, &mut load_problems).await
        };

        let aliases = Self::alias_entries(fs, &tap.root.join(ALIAS_DIR), &mut load_problems).await;

        tracing::debug!(
            tap = %tap.id,
            definitions = definitions.len(),
            aliases = aliases.len(),
            "loaded tap"
        );

        Self {
            id: tap.id.clone(),
            root: tap.root.clone(),
            definition_dir,
            definitions,
            aliases,
            load_problems,
        }
    }

    async fn top_level_definitions(
        fs: &dyn Filesystem,
        root: &Path,
        problems: &mut Vec<Diagnostic>,
    ) -> Vec<DefinitionFile> {
        match fs.list(root).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| !e.is_dir() && has_definition_ext(Path::new(&e.name)))
                .map(|e| DefinitionFile::new(root.join(e.name)))
                .collect(),
            Err(e) => {
                problems.push(Diagnostic::UnreadableFile {
                    file: root.to_path_buf(),
                    cause: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    async fn nested_definitions(
        fs: &dyn Filesystem,
        dir: &Path,
        problems: &mut Vec<Diagnostic>,
    ) -> Vec<DefinitionFile> {
        let include = match GlobFilter::new(&format!("**/*.{DEFINITION_EXT}")) {
            Ok(filter) => filter,
            Err(e) => {
                problems.push(Diagnostic::CheckFailed {
                    file: dir.to_path_buf(),
                    cause: e.to_string(),
                });
                return Vec::new();
            }
        };
        let exclude = SegmentExclusion::default();
        let mut walker = FileWalker::new(VfsWalker(fs), dir, &include, &exclude);

        let mut definitions = Vec::new();
        while let Some(item) = walker.next().await {
            match item {
                Ok(path) => definitions.push(DefinitionFile::new(path)),
                Err(e) => problems.push(crate::scanner::walk_error_diagnostic(e)),
            }
        }
        definitions
    }

    async fn alias_entries(
        fs: &dyn Filesystem,
        alias_dir: &Path,
        problems: &mut Vec<Diagnostic>,
    ) -> Vec<AliasEntry> {
        if !fs.is_dir(alias_dir).await {
            return Vec::new();
        }
        match fs.list(alias_dir).await {
            Ok(entries) => entries
                .into_iter()
                .map(|e| match e.symlink_target {
                    Some(target) if e.is_symlink() => AliasEntry::link(e.name, target),
                    _ => AliasEntry::plain(e.name),
                })
                .collect(),
            Err(e) => {
                problems.push(Diagnostic::UnreadableFile {
                    file: alias_dir.to_path_buf(),
                    cause: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    /// Alias directory of this tap.
    pub fn alias_dir(&self) -> PathBuf {
        self.root.join(ALIAS_DIR)
    }

    /// The definition with this canonical name, if any.
    pub fn definition_named(&self, name: &str) -> Option<&DefinitionFile> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Is `path` (normalized, library-relative) one of this tap's definitions?
    pub fn has_definition_at(&self, path: &Path) -> bool {
        self.definitions.iter().any(|d| d.path == path)
    }
}

pub(crate) fn has_definition_ext(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == DEFINITION_EXT)
}
