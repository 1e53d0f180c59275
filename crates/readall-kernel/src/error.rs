//! Fatal errors: conditions under which no useful validation can happen.
//!
//! Everything recoverable is a [`crate::Diagnostic`] instead.

use std::io;
use std::path::PathBuf;

use readall_glob::WalkerError;

use crate::tap::TapId;

#[derive(Debug, thiserror::Error)]
pub enum ReadallError {
    /// A requested tap is not installed.
    #[error("no such tap: {0}")]
    UnknownTap(TapId),

    /// A requested tap name cannot name any tap.
    #[error("invalid tap name {name:?}: {reason}")]
    InvalidTapName { name: String, reason: &'static str },

    /// A scan or taps root exists but cannot be enumerated.
    #[error("cannot read {}: {source}", .path.display())]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No usable syntax checker.
    #[error("syntax checker unavailable: {0}")]
    OracleUnavailable(String),

    /// The scan pattern does not compile.
    #[error(transparent)]
    Pattern(#[from] WalkerError),

    /// The configuration file is malformed.
    #[error("invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

pub type Result<T, E = ReadallError> = std::result::Result<T, E>;
