//! Core VFS traits and types.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirEntryKind {
    File,
    Directory,
    Symlink,
}

/// A directory entry: the unified file metadata type.
///
/// Returned by `list()`, `stat()` and `lstat()`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Name of the entry (not full path).
    pub name: String,
    /// Kind of entry.
    pub kind: DirEntryKind,
    /// Size in bytes (0 for directories and symlinks).
    pub size: u64,
    /// For symlinks, the target path exactly as stored in the link.
    pub symlink_target: Option<PathBuf>,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DirEntryKind::Directory,
            size: 0,
            symlink_target: None,
        }
    }

    /// Create a new file entry.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: DirEntryKind::File,
            size,
            symlink_target: None,
        }
    }

    /// Create a new symlink entry.
    pub fn symlink(name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: DirEntryKind::Symlink,
            size: 0,
            symlink_target: Some(target.into()),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == DirEntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == DirEntryKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == DirEntryKind::Symlink
    }
}

/// Abstract filesystem interface.
///
/// All operations use paths relative to the filesystem root.
/// For example, if a `LocalFs` is rooted at `/usr/local/Homebrew/Library`,
/// then `read("Homebrew/cmd/readall.rb")` reads
/// `/usr/local/Homebrew/Library/Homebrew/cmd/readall.rb`.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Read the entire contents of a file.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write data to a file, creating it and its parents if needed.
    ///
    /// Returns `Err` if the filesystem is read-only.
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// List entries in a directory, sorted by name.
    ///
    /// Entry kinds are reported without following symlinks.
    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Get metadata for a file or directory, following symlinks.
    async fn stat(&self, path: &Path) -> io::Result<DirEntry>;

    /// Create a directory (and parent directories if needed).
    ///
    /// Returns `Err` if the filesystem is read-only.
    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool;

    /// Check if a path exists (following symlinks).
    async fn exists(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok()
    }

    /// Check if a path resolves to a directory.
    async fn is_dir(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok_and(|e| e.is_dir())
    }

    /// Check if a path resolves to a regular file.
    async fn is_file(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok_and(|e| e.is_file())
    }

    /// Map an absolute path (typically an absolute symlink target) back into
    /// this filesystem's namespace.
    ///
    /// Virtual backends treat absolute paths as rooted at their own root.
    /// Returns `None` if the path lies outside the root.
    fn virtual_path(&self, absolute: &Path) -> Option<PathBuf> {
        absolute.strip_prefix("/").ok().map(Path::to_path_buf)
    }

    /// Read the target of a symbolic link without following it.
    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let _ = path;
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "symlinks not supported by this filesystem",
        ))
    }

    /// Create a symbolic link at `link` pointing to `target`.
    ///
    /// The target path is stored as-is (may be relative or absolute).
    async fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let _ = (target, link);
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "symlinks not supported by this filesystem",
        ))
    }

    /// Get metadata for a path without following symlinks.
    async fn lstat(&self, path: &Path) -> io::Result<DirEntry> {
        // Default: same as stat (for backends that don't support symlinks)
        self.stat(path).await
    }
}

/// Lexically normalize a relative VFS path: drop `.`, resolve `..`.
///
/// Returns `None` if `..` would climb above the root.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::Normal(s) => result.push(s),
            std::path::Component::ParentDir => {
                if !result.pop() {
                    return None;
                }
            }
            std::path::Component::CurDir
            | std::path::Component::RootDir
            | std::path::Component::Prefix(_) => {}
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(
            normalize(Path::new("Taps/a/homebrew-b/Aliases/../Formula/./foo.rb")),
            Some(PathBuf::from("Taps/a/homebrew-b/Formula/foo.rb"))
        );
    }

    #[test]
    fn normalize_refuses_to_escape() {
        assert_eq!(normalize(Path::new("a/../../b")), None);
    }

    #[test]
    fn normalize_strips_root() {
        assert_eq!(normalize(Path::new("/a/b")), Some(PathBuf::from("a/b")));
    }
}
