//! readall: syntax and alias validation across a Homebrew library.
//!
//! Two independent checks over one library directory:
//!
//! - **Syntax**: [`FileScanner`] walks the library's own source tree
//!   (`Homebrew/**/*.rb`, skipping `vendor` and `cask`) and
//!   [`SyntaxValidator`] asks a [`SyntaxOracle`] about every file.
//! - **Taps**: for each selected tap, [`TapStructureValidator`] checks that
//!   the tap has definitions, that they parse, and (optionally) that every
//!   alias resolves through [`AliasResolver`].
//!
//! Both feed a [`ResultAggregator`]; the run's single pass/fail bit is
//! [`AggregateResult::any_failed`]. Nothing short of an unknown tap or an
//! unreadable scan root stops a run early.
//!
//! All I/O goes through the [`Filesystem`] trait so tests can build
//! libraries in memory.

pub mod aggregate;
pub mod alias;
mod backend_walker_fs;
pub mod config;
pub mod engine;
pub mod error;
pub mod options;
pub mod oracle;
pub mod outcome;
pub mod paths;
pub mod scanner;
pub mod structure;
pub mod syntax;
pub mod tap;
pub mod vfs;

pub use aggregate::{AggregateResult, ResultAggregator, SharedAggregator};
pub use alias::{AliasResolver, is_valid_package_name};
pub use config::ReadallConfig;
pub use engine::Readall;
pub use error::{ReadallError, Result};
pub use options::{TapSelection, ValidationOptions};
pub use oracle::{OracleError, RubyOracle, SyntaxOracle, SyntaxVerdict};
pub use outcome::{AliasDefect, Diagnostic, Scope, ValidationOutcome};
pub use scanner::{FileScanner, FileWalk, ScanSettings};
pub use structure::{TapCheckState, TapStructureValidator};
pub use syntax::SyntaxValidator;
pub use tap::{
    AliasEntry, DefinitionFile, Tap, TapDirectory, TapId, TapListing, TapRef, TapRegistry,
};
pub use vfs::{DirEntry, DirEntryKind, Filesystem, LocalFs, MemoryFs};
