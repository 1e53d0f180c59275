//! Local filesystem backend.
//!
//! Provides access to real filesystem paths, with optional read-only mode.

use super::traits::{normalize, DirEntry, DirEntryKind, Filesystem};
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/usr/local/Homebrew/Library`, then `read("Homebrew/global.rb")` reads
/// `/usr/local/Homebrew/Library/Homebrew/global.rb`.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
    read_only: bool,
}

impl LocalFs {
    /// Create a new writable local filesystem rooted at the given path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: false,
        }
    }

    /// Create a read-only local filesystem.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: true,
        }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn canonical_root(&self) -> PathBuf {
        self.root.canonicalize().unwrap_or_else(|_| self.root.clone())
    }

    /// Resolve a relative path to an absolute path within the root,
    /// following symlinks.
    ///
    /// Returns an error if the path escapes the root (via `..` or a symlink).
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let path = path.strip_prefix("/").unwrap_or(path);
        let full = self.root.join(path);

        // Canonicalize to resolve symlinks and `..`. For non-existent paths,
        // canonicalize the parent and append the file name.
        let canonical = if full.exists() {
            full.canonicalize()?
        } else {
            let parent = full
                .parent()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;
            let filename = full
                .file_name()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;

            if parent.exists() {
                parent.canonicalize()?.join(filename)
            } else {
                let relative = normalize(path).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::PermissionDenied, "path escapes root")
                })?;
                self.canonical_root().join(relative)
            }
        };

        let canonical_root = self.canonical_root();
        if !canonical.starts_with(&canonical_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "path escapes root: {} is not under {}",
                    canonical.display(),
                    canonical_root.display()
                ),
            ));
        }

        Ok(canonical)
    }

    /// Resolve a path within the root WITHOUT following symlinks.
    ///
    /// Used by `lstat()`, `read_link()` and `list()`, which must see links
    /// themselves. Containment is checked lexically.
    fn resolve_no_follow(&self, path: &Path) -> io::Result<PathBuf> {
        let path = path.strip_prefix("/").unwrap_or(path);
        let relative = normalize(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::PermissionDenied, "path escapes root")
        })?;
        Ok(self.root.join(relative))
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "filesystem is read-only",
            ))
        } else {
            Ok(())
        }
    }

    fn entry_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    }
}

#[async_trait]
impl Filesystem for LocalFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        fs::read(&full_path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&full_path, data).await
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let full_path = self.resolve_no_follow(path)?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            // symlink_metadata reports the link itself, not its target
            let metadata = fs::symlink_metadata(entry.path()).await?;
            let file_type = metadata.file_type();

            let (kind, symlink_target) = if file_type.is_symlink() {
                let target = fs::read_link(entry.path()).await.ok();
                (DirEntryKind::Symlink, target)
            } else if file_type.is_dir() {
                (DirEntryKind::Directory, None)
            } else {
                // Special files (sockets, pipes, devices) → File.
                (DirEntryKind::File, None)
            };

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                size: if kind == DirEntryKind::File { metadata.len() } else { 0 },
                symlink_target,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path).await?;

        let kind = if meta.is_dir() {
            DirEntryKind::Directory
        } else {
            DirEntryKind::File
        };

        Ok(DirEntry {
            name: Self::entry_name(path),
            kind,
            size: if meta.is_dir() { 0 } else { meta.len() },
            symlink_target: None,
        })
    }

    async fn lstat(&self, path: &Path) -> io::Result<DirEntry> {
        let full_path = self.resolve_no_follow(path)?;
        let meta = fs::symlink_metadata(&full_path).await?;

        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            DirEntryKind::Symlink
        } else if meta.is_dir() {
            DirEntryKind::Directory
        } else {
            DirEntryKind::File
        };

        let symlink_target = if file_type.is_symlink() {
            fs::read_link(&full_path).await.ok()
        } else {
            None
        };

        Ok(DirEntry {
            name: Self::entry_name(path),
            kind,
            size: if kind == DirEntryKind::File { meta.len() } else { 0 },
            symlink_target,
        })
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let full_path = self.resolve_no_follow(path)?;
        fs::read_link(&full_path).await
    }

    async fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.check_writable()?;
        let link_path = self.resolve_no_follow(link)?;

        if let Some(parent) = link_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        #[cfg(unix)]
        {
            fs::symlink(target, &link_path).await
        }
        #[cfg(windows)]
        {
            fs::symlink_file(target, &link_path).await
        }
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve_no_follow(path)?;
        fs::create_dir_all(&full_path).await
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn virtual_path(&self, absolute: &Path) -> Option<PathBuf> {
        let relative = absolute
            .strip_prefix(&self.root)
            .ok()
            .map(Path::to_path_buf)
            .or_else(|| {
                absolute
                    .strip_prefix(self.canonical_root())
                    .ok()
                    .map(Path::to_path_buf)
            })?;
        // `..` inside an absolute target may still climb out
        if relative.components().any(|c| c == Component::ParentDir) {
            return normalize(&relative);
        }
        Some(relative)
    }
}
