//! Virtual filesystem (VFS) for readall.
//!
//! Every component reads the Homebrew library through [`Filesystem`], never
//! through `std::fs` directly:
//!
//! - **LocalFs**: the real library directory, normally opened read-only
//! - **MemoryFs**: in-memory trees with symlinks, for tests and fixtures
//!
//! Paths are relative to the filesystem root (the library directory), e.g.
//! `Homebrew/cmd/readall.rb` or `Taps/homebrew/homebrew-core/Aliases/python`.

mod local;
mod memory;
mod traits;

pub use local::LocalFs;
pub use memory::MemoryFs;
pub use traits::{normalize, DirEntry, DirEntryKind, Filesystem};
