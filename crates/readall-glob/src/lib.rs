//! readall-glob: candidate-file discovery for readall.
//!
//! Two pieces, both free of real filesystem calls:
//!
//! - **Filters**: [`GlobFilter`] decides whether a path is a candidate
//!   (gitignore-style whitelist glob, e.g. `**/*.rb`), [`SegmentExclusion`]
//!   rejects anything under a named directory segment (`vendor`, `cask`).
//! - **Walker**: [`FileWalker`] lazily enumerates files beneath a root over
//!   any [`WalkerFs`] backend, one path per `next().await`.
//!
//! The kernel bridges its VFS to [`WalkerFs`], so the same walker runs over
//! the real filesystem and over in-memory test trees.

mod filter;
mod walker;

pub use filter::{GlobFilter, SegmentExclusion};
pub use walker::{FileWalker, WalkerDirEntry, WalkerError, WalkerFs};
