//! The syntax-checking oracle.
//!
//! readall never parses Ruby itself. An oracle answers one question per
//! file: is this well-formed? The answer never involves running the file.

mod ruby;

pub use ruby::RubyOracle;

use std::io;
use std::path::Path;

use async_trait::async_trait;

/// Answer from an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxVerdict {
    Valid,
    Invalid { line: Option<u32>, message: String },
}

impl SyntaxVerdict {
    pub fn invalid(line: Option<u32>, message: impl Into<String>) -> Self {
        SyntaxVerdict::Invalid {
            line,
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SyntaxVerdict::Valid)
    }
}

/// The oracle itself could not give an answer.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("i/o error talking to syntax checker: {0}")]
    Io(#[from] io::Error),
}

/// Checks the syntax of one file.
#[async_trait]
pub trait SyntaxOracle: Send + Sync {
    /// `path` is used for messages only; `source` is what gets checked.
    async fn check(&self, path: &Path, source: &[u8]) -> Result<SyntaxVerdict, OracleError>;
}
