//! `WalkerFs` adapter for the VFS.
//!
//! Bridges readall-kernel's `Filesystem` trait to readall-glob's `WalkerFs`
//! trait so `FileWalker` can run over any backend.

use async_trait::async_trait;
use std::path::Path;

use crate::vfs::{DirEntry, Filesystem};
use readall_glob::{WalkerDirEntry, WalkerError, WalkerFs};

/// Wraps a `&dyn Filesystem` to implement `WalkerFs`.
pub struct VfsWalker<'a>(pub &'a dyn Filesystem);

impl WalkerDirEntry for DirEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_dir(&self) -> bool {
        DirEntry::is_dir(self)
    }

    fn is_file(&self) -> bool {
        DirEntry::is_file(self)
    }

    fn is_symlink(&self) -> bool {
        DirEntry::is_symlink(self)
    }
}

#[async_trait]
impl WalkerFs for VfsWalker<'_> {
    type DirEntry = DirEntry;

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, WalkerError> {
        self.0.list(path).await.map_err(|e| WalkerError::Io(e.to_string()))
    }

    async fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path).await
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        self.0.exists(path).await
    }
}
