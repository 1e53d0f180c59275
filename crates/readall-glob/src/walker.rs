//! Lazy, restartable file walking over an abstract filesystem.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{GlobFilter, SegmentExclusion};

/// Errors produced while walking.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalkerError {
    /// Backend I/O failure.
    #[error("io error: {0}")]
    Io(String),
    /// A directory beneath the root could not be listed.
    #[error("cannot list {}: {message}", .path.display())]
    ListDir { path: PathBuf, message: String },
    /// The glob pattern did not compile.
    #[error("invalid glob pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}

/// Minimal directory entry view the walker needs.
pub trait WalkerDirEntry {
    fn name(&self) -> &str;
    fn is_dir(&self) -> bool;
    fn is_file(&self) -> bool;
    fn is_symlink(&self) -> bool;
}

/// Filesystem operations the walker needs.
#[async_trait]
pub trait WalkerFs: Send + Sync {
    type DirEntry: WalkerDirEntry + Send;

    /// List the direct children of a directory. Must not follow symlinks
    /// when reporting entry kinds.
    async fn list_dir(&self, path: &Path) -> Result<Vec<Self::DirEntry>, WalkerError>;

    /// Does the path resolve (following symlinks) to a regular file?
    async fn is_file(&self, path: &Path) -> bool;

    /// Does the path resolve (following symlinks) to a directory?
    async fn is_dir(&self, path: &Path) -> bool;

    /// Does anything exist at the path?
    async fn exists(&self, path: &Path) -> bool;
}

/// Depth-first walk yielding candidate files one at a time.
///
/// Nothing is listed until the first `next()`. Directories are visited in
/// name order, files of a directory before its subdirectories. Directory
/// symlinks are never descended into. A directory that cannot be listed is
/// yielded as `Err(WalkerError::ListDir)` and the walk carries on.
pub struct FileWalker<'a, F> {
    fs: F,
    root: PathBuf,
    include: &'a GlobFilter,
    exclude: &'a SegmentExclusion,
    pending_dirs: Vec<PathBuf>,
    ready: VecDeque<PathBuf>,
}

impl<'a, F: WalkerFs> FileWalker<'a, F> {
    /// Create a walker rooted at `root`. Yielded paths are `root`-joined.
    pub fn new(
        fs: F,
        root: impl Into<PathBuf>,
        include: &'a GlobFilter,
        exclude: &'a SegmentExclusion,
    ) -> Self {
        Self {
            fs,
            root: root.into(),
            include,
            exclude,
            pending_dirs: vec![PathBuf::new()],
            ready: VecDeque::new(),
        }
    }

    /// The walk root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Next candidate file, or `None` once the tree is exhausted.
    pub async fn next(&mut self) -> Option<Result<PathBuf, WalkerError>> {
        loop {
            if let Some(relative) = self.ready.pop_front() {
                return Some(Ok(self.root.join(relative)));
            }

            let dir = self.pending_dirs.pop()?;
            let full = if dir.as_os_str().is_empty() {
                self.root.clone()
            } else {
                self.root.join(&dir)
            };
            let mut entries = match self.fs.list_dir(&full).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %full.display(), error = %e, "skipping unlistable directory");
                    return Some(Err(WalkerError::ListDir {
                        path: full,
                        message: e.to_string(),
                    }));
                }
            };
            entries.sort_by(|a, b| a.name().cmp(b.name()));

            let mut subdirs = Vec::new();
            for entry in entries {
                let relative = dir.join(entry.name());
                if entry.is_dir() && !entry.is_symlink() {
                    if self.exclude.excludes_dir(&relative) {
                        tracing::trace!(path = %relative.display(), "excluded directory");
                    } else {
                        subdirs.push(relative);
                    }
                    continue;
                }

                let is_file = entry.is_file()
                    || (entry.is_symlink() && self.fs.is_file(&self.root.join(&relative)).await);
                if is_file && self.include.matches(&relative) && !self.exclude.excludes(&relative) {
                    self.ready.push_back(relative);
                }
            }

            // Stack: push in reverse so the first subdirectory is walked first.
            self.pending_dirs.extend(subdirs.into_iter().rev());
        }
    }

    /// Drain the walk into a vector, keeping errors in place.
    pub async fn collect(mut self) -> Vec<Result<PathBuf, WalkerError>> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item);
        }
        out
    }
}
