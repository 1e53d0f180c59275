//! FileScanner: enumerate candidate source files beneath a root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use readall_glob::{FileWalker, GlobFilter, SegmentExclusion, WalkerError};

use crate::backend_walker_fs::VfsWalker;
use crate::error::ReadallError;
use crate::outcome::Diagnostic;
use crate::vfs::Filesystem;

/// Default scan root: Homebrew's own Ruby sources inside the library.
pub const DEFAULT_SCAN_ROOT: &str = "Homebrew";

/// Default candidate pattern.
pub const DEFAULT_PATTERN: &str = "**/*.rb";

/// Directory names never scanned: vendored gems and cask code.
pub const DEFAULT_EXCLUDED_SEGMENTS: [&str; 2] = ["vendor", "cask"];

/// What to scan and what to leave alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Root, relative to the filesystem root.
    pub root: PathBuf,
    /// Gitignore-style glob relative to `root`.
    pub pattern: String,
    /// Directory names whose contents are never scanned.
    pub exclude: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_SCAN_ROOT),
            pattern: DEFAULT_PATTERN.to_string(),
            exclude: DEFAULT_EXCLUDED_SEGMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Enumerates candidate files. Each [`FileScanner::walk`] starts afresh.
pub struct FileScanner {
    fs: Arc<dyn Filesystem>,
    root: PathBuf,
    include: GlobFilter,
    exclude: SegmentExclusion,
}

impl FileScanner {
    pub fn new(fs: Arc<dyn Filesystem>, settings: &ScanSettings) -> Result<Self, ReadallError> {
        Ok(Self {
            fs,
            root: settings.root.clone(),
            include: GlobFilter::new(&settings.pattern)?,
            exclude: SegmentExclusion::new(settings.exclude.iter().cloned()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a lazy walk.
    ///
    /// A missing root is an empty walk. A root that exists but cannot be
    /// listed is fatal: nothing beneath it could be checked.
    pub async fn walk(&self) -> Result<FileWalk<'_>, ReadallError> {
        if !self.fs.exists(&self.root).await {
            tracing::info!(root = %self.root.display(), "scan root missing; nothing to scan");
            return Ok(FileWalk { inner: None });
        }
        if let Err(source) = self.fs.list(&self.root).await {
            return Err(ReadallError::UnreadableRoot {
                path: self.root.clone(),
                source,
            });
        }
        Ok(FileWalk {
            inner: Some(FileWalker::new(
                VfsWalker(self.fs.as_ref()),
                self.root.clone(),
                &self.include,
                &self.exclude,
            )),
        })
    }

    /// Walk to completion.
    pub async fn collect(&self) -> Result<Vec<Result<PathBuf, WalkerError>>, ReadallError> {
        let mut walk = self.walk().await?;
        let mut out = Vec::new();
        while let Some(item) = walk.next().await {
            out.push(item);
        }
        Ok(out)
    }
}

/// One pass over the scan root.
pub struct FileWalk<'a> {
    inner: Option<FileWalker<'a, VfsWalker<'a>>>,
}

impl FileWalk<'_> {
    /// Next candidate, or a directory that could not be listed.
    pub async fn next(&mut self) -> Option<Result<PathBuf, WalkerError>> {
        match &mut self.inner {
            Some(walker) => walker.next().await,
            None => None,
        }
    }
}

/// Turn a walk failure into the diagnostic reported for it.
pub(crate) fn walk_error_diagnostic(error: WalkerError) -> Diagnostic {
    match error {
        WalkerError::ListDir { path, message } => Diagnostic::UnreadableFile {
            file: path,
            cause: message,
        },
        other => Diagnostic::UnreadableFile {
            file: PathBuf::new(),
            cause: other.to_string(),
        },
    }
}
