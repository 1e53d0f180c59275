//! Syntax checking with `ruby -c -w`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{OracleError, SyntaxOracle, SyntaxVerdict};
use crate::error::ReadallError;

/// Warnings ruby emits that say nothing about the file's correctness.
/// See https://bugs.ruby-lang.org/issues/12359.
const IGNORED_WARNINGS: [&str; 1] = ["named capture conflicts a local variable"];

/// `-:<line>: <message>` as printed for a program read from stdin.
static LOCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^-:(\d+):\s*(.*)$").ok());

/// Checks files with a Ruby interpreter in syntax-only mode.
///
/// Content is fed on stdin with `-c` (check only, never execute) and `-w`
/// (verbose warnings). Any warning that survives filtering fails the file,
/// as does a non-zero exit.
#[derive(Debug, Clone)]
pub struct RubyOracle {
    program: PathBuf,
}

impl RubyOracle {
    /// Use `program` without probing it.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find a working interpreter: `program` if given, else `ruby` on `PATH`.
    pub async fn locate(program: Option<PathBuf>) -> Result<Self, ReadallError> {
        let program = program.unwrap_or_else(|| PathBuf::from("ruby"));
        let output = Command::new(&program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ReadallError::OracleUnavailable(format!("{}: {e}", program.display()))
            })?;

        if !output.status.success() {
            return Err(ReadallError::OracleUnavailable(format!(
                "{} --version exited with {}",
                program.display(),
                output.status
            )));
        }

        tracing::info!(
            ruby = %program.display(),
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "using ruby for syntax checks"
        );
        Ok(Self::new(program))
    }

    /// Judge ruby's stderr and exit status.
    fn verdict(path: &Path, success: bool, stderr: &str) -> SyntaxVerdict {
        let messages: Vec<&str> = stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter(|l| !IGNORED_WARNINGS.iter().any(|w| l.contains(w)))
            .collect();

        if success && messages.is_empty() {
            return SyntaxVerdict::Valid;
        }
        if messages.is_empty() {
            return SyntaxVerdict::invalid(None, "syntax check failed without a message");
        }

        let mut line = None;
        let mut text = Vec::with_capacity(messages.len());
        for message in messages {
            let located = LOCATION.as_ref().and_then(|re| re.captures(message));
            match located {
                Some(caps) if line.is_none() => {
                    line = caps.get(1).and_then(|m| m.as_str().parse().ok());
                    text.push(caps.get(2).map_or("", |m| m.as_str()).to_string());
                }
                _ => text.push(match message.strip_prefix("-:") {
                    Some(rest) => format!("{}:{rest}", path.display()),
                    None => message.to_string(),
                }),
            }
        }
        SyntaxVerdict::invalid(line, text.join("\n"))
    }
}

#[async_trait]
impl SyntaxOracle for RubyOracle {
    async fn check(&self, path: &Path, source: &[u8]) -> Result<SyntaxVerdict, OracleError> {
        let mut child = Command::new(&self.program)
            .args(["-c", "-w", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OracleError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(source).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        // A checker that exits early on a fatal error may close stdin first;
        // its exit status and stderr are still the answer.
        if let Err(e) = fed {
            tracing::debug!(path = %path.display(), error = %e, "ruby closed stdin early");
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let verdict = Self::verdict(path, output.status.success(), &stderr);
        tracing::debug!(path = %path.display(), valid = verdict.is_valid(), "ruby -c");
        Ok(verdict)
    }
}
