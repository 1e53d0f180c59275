//! Per-file syntax validation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::oracle::{SyntaxOracle, SyntaxVerdict};
use crate::outcome::{Diagnostic, ValidationOutcome};
use crate::vfs::Filesystem;

/// Reads files through the VFS and asks the oracle about each one.
///
/// Cheap to clone: workers each take their own handle.
#[derive(Clone)]
pub struct SyntaxValidator {
    fs: Arc<dyn Filesystem>,
    oracle: Arc<dyn SyntaxOracle>,
}

impl SyntaxValidator {
    pub fn new(fs: Arc<dyn Filesystem>, oracle: Arc<dyn SyntaxOracle>) -> Self {
        Self { fs, oracle }
    }

    /// Check one file. Never fails: every problem lands in the outcome.
    pub async fn check_file(&self, path: &Path) -> ValidationOutcome {
        ValidationOutcome::file(path, self.diagnose(path).await.into_iter().collect())
    }

    /// The diagnostic for `path`, if it has one.
    pub async fn diagnose(&self, path: &Path) -> Option<Diagnostic> {
        let source = match self.fs.read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unreadable");
                return Some(Diagnostic::UnreadableFile {
                    file: path.to_path_buf(),
                    cause: e.to_string(),
                });
            }
        };

        match self.oracle.check(path, &source).await {
            Ok(SyntaxVerdict::Valid) => None,
            Ok(SyntaxVerdict::Invalid { line, message }) => Some(Diagnostic::Syntax {
                file: path.to_path_buf(),
                line,
                message,
            }),
            Err(e) => Some(Diagnostic::CheckFailed {
                file: path.to_path_buf(),
                cause: e.to_string(),
            }),
        }
    }

    /// Check files one after another. A bad file never stops the rest.
    pub async fn check_files<I>(&self, paths: I) -> Vec<ValidationOutcome>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut outcomes = Vec::new();
        for path in paths {
            outcomes.push(self.check_file(&path).await);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::vfs::MemoryFs;
    use async_trait::async_trait;

    /// Rejects any source containing `BAD` on line 1; errors on `BOOM`.
    struct Marker;

    #[async_trait]
    impl SyntaxOracle for Marker {
        async fn check(&self, _path: &Path, source: &[u8]) -> Result<SyntaxVerdict, OracleError> {
            let text = String::from_utf8_lossy(source);
            if text.contains("BOOM") {
                return Err(OracleError::Io(std::io::Error::other("checker crashed")));
            }
            if text.contains("BAD") {
                return Ok(SyntaxVerdict::invalid(Some(1), "unexpected BAD"));
            }
            Ok(SyntaxVerdict::Valid)
        }
    }

    async fn validator(files: &[(&str, &str)]) -> SyntaxValidator {
        let fs = MemoryFs::new();
        for (path, body) in files {
            fs.write(Path::new(path), body.as_bytes()).await.unwrap();
        }
        SyntaxValidator::new(Arc::new(fs), Arc::new(Marker))
    }

    #[tokio::test]
    async fn valid_file_is_ok() {
        let v = validator(&[("a.rb", "puts 1\n")]).await;
        let outcome = v.check_file(Path::new("a.rb")).await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.subject, "a.rb");
    }

    #[tokio::test]
    async fn invalid_file_names_file_and_line() {
        let v = validator(&[("b.rb", "BAD")]).await;
        let outcome = v.check_file(Path::new("b.rb")).await;
        assert!(!outcome.is_ok());
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::Syntax {
                file: PathBuf::from("b.rb"),
                line: Some(1),
                message: "unexpected BAD".into(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let v = validator(&[]).await;
        let outcome = v.check_file(Path::new("gone.rb")).await;
        assert!(matches!(
            outcome.diagnostics.as_slice(),
            [Diagnostic::UnreadableFile { .. }]
        ));
    }

    #[tokio::test]
    async fn oracle_failure_is_a_diagnostic() {
        let v = validator(&[("c.rb", "BOOM")]).await;
        let outcome = v.check_file(Path::new("c.rb")).await;
        assert!(matches!(
            outcome.diagnostics.as_slice(),
            [Diagnostic::CheckFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn check_files_continues_past_failures() {
        let v = validator(&[("a.rb", "ok"), ("b.rb", "BAD"), ("c.rb", "ok")]).await;
        let outcomes = v
            .check_files(["a.rb", "b.rb", "missing.rb", "c.rb"].map(PathBuf::from))
            .await;
        let ok: Vec<bool> = outcomes.iter().map(|o| o.ok).collect();
        assert_eq!(ok, vec![true, false, false, true]);
    }
}
