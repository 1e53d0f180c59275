//! Discovering installed taps.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{REPO_PREFIX, TAPS_DIR, TapId, TapRef};
use crate::error::ReadallError;
use crate::outcome::Diagnostic;
use crate::vfs::Filesystem;

/// Taps found by a registry, plus directories it could not look inside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapListing {
    pub taps: Vec<TapRef>,
    /// One `UnreadableFile` per directory that could not be listed.
    pub unreadable: Vec<Diagnostic>,
}

/// Source of installed taps.
#[async_trait]
pub trait TapRegistry: Send + Sync {
    /// Every installed tap, sorted by identifier.
    async fn installed(&self) -> Result<TapListing, ReadallError>;

    /// The taps named by `ids`, in the order given.
    ///
    /// An empty request means every installed tap, along with any
    /// directories that could not be enumerated. Any identifier that is not
    /// installed fails the whole request with [`ReadallError::UnknownTap`].
    async fn resolve(&self, ids: &[TapId]) -> Result<TapListing, ReadallError> {
        let installed = self.installed().await?;
        if ids.is_empty() {
            return Ok(installed);
        }
        let taps = ids
            .iter()
            .map(|id| {
                installed
                    .taps
                    .iter()
                    .find(|t| &t.id == id)
                    .cloned()
                    .ok_or_else(|| ReadallError::UnknownTap(id.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(TapListing {
            taps,
            unreadable: Vec::new(),
        })
    }
}

/// Registry backed by the `Taps/<owner>/homebrew-<repo>` directory layout.
pub struct TapDirectory {
    fs: Arc<dyn Filesystem>,
    taps_dir: PathBuf,
}

impl TapDirectory {
    /// Taps under the library's conventional `Taps/` directory.
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self {
            fs,
            taps_dir: PathBuf::from(TAPS_DIR),
        }
    }

    async fn subdirs(&self, dir: &Path) -> io::Result<Vec<String>> {
        let entries = self.fs.list(dir).await?;

        let mut names = Vec::with_capacity(entries.len());
        for entry in entries {
            // Taps are often symlinked in during development.
            let is_dir = entry.is_dir() || self.fs.is_dir(&dir.join(&entry.name)).await;
            if is_dir {
                names.push(entry.name);
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl TapRegistry for TapDirectory {
    async fn installed(&self) -> Result<TapListing, ReadallError> {
        let mut listing = TapListing::default();
        if !self.fs.exists(&self.taps_dir).await {
            tracing::debug!(dir = %self.taps_dir.display(), "no taps directory");
            return Ok(listing);
        }

        let owners =
            self.subdirs(&self.taps_dir)
                .await
                .map_err(|source| ReadallError::UnreadableRoot {
                    path: self.taps_dir.clone(),
                    source,
                })?;

        for owner in owners {
            let owner_dir = self.taps_dir.join(&owner);
            let repos = match self.subdirs(&owner_dir).await {
                Ok(repos) => repos,
                Err(e) => {
                    tracing::warn!(path = %owner_dir.display(), error = %e, "skipping unlistable tap owner");
                    listing.unreadable.push(Diagnostic::UnreadableFile {
                        file: owner_dir,
                        cause: e.to_string(),
                    });
                    continue;
                }
            };
            for repo in repos {
                if !repo.starts_with(REPO_PREFIX) {
                    continue;
                }
                match TapId::new(&owner, &repo) {
                    Ok(id) => listing.taps.push(TapRef {
                        root: owner_dir.join(&repo),
                        id,
                    }),
                    Err(e) => tracing::warn!(error = %e, "skipping tap directory"),
                }
            }
        }
        listing.taps.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryFs;

    async fn registry(dirs: &[&str]) -> TapDirectory {
        let fs = MemoryFs::new();
        for d in dirs {
            fs.mkdir(Path::new(d)).await.unwrap();
        }
        TapDirectory::new(Arc::new(fs))
    }

    fn ids(taps: &[TapRef]) -> Vec<String> {
        taps.iter().map(|t| t.id.to_string()).collect()
    }

    #[tokio::test]
    async fn lists_taps_sorted() {
        let reg = registry(&[
            "Taps/zed/homebrew-last",
            "Taps/homebrew/homebrew-core",
            "Taps/foo/homebrew-bar",
            "Taps/foo/not-a-tap",
        ])
        .await;

        let taps = reg.installed().await.unwrap().taps;

        assert_eq!(ids(&taps), vec!["foo/bar", "homebrew/core", "zed/last"]);
        assert_eq!(taps[0].root, PathBuf::from("Taps/foo/homebrew-bar"));
    }

    #[tokio::test]
    async fn missing_taps_dir_is_empty() {
        let reg = registry(&["Homebrew"]).await;
        assert_eq!(reg.installed().await.unwrap(), TapListing::default());
    }

    #[tokio::test]
    async fn resolve_keeps_request_order() {
        let reg = registry(&["Taps/homebrew/homebrew-core", "Taps/foo/homebrew-bar"]).await;
        let want: Vec<TapId> = vec!["core".parse().unwrap(), "foo/bar".parse().unwrap()];

        let taps = reg.resolve(&want).await.unwrap().taps;

        assert_eq!(ids(&taps), vec!["homebrew/core", "foo/bar"]);
    }

    #[tokio::test]
    async fn resolve_nothing_means_everything() {
        let reg = registry(&["Taps/homebrew/homebrew-core", "Taps/foo/homebrew-bar"]).await;
        assert_eq!(reg.resolve(&[]).await.unwrap().taps.len(), 2);
    }

    #[tokio::test]
    async fn unknown_tap_is_fatal() {
        let reg = registry(&["Taps/homebrew/homebrew-core"]).await;
        let err = reg
            .resolve(&["foo/bar".parse().unwrap()])
            .await
            .unwrap_err();
        assert!(matches!(err, ReadallError::UnknownTap(ref id) if id.to_string() == "foo/bar"));
    }
}
