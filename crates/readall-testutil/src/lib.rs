//! Test utilities for readall.
//!
//! - [`ScriptedOracle`]: a syntax oracle that needs no Ruby. Any line
//!   containing [`SYNTAX_ERROR_MARKER`] makes a file invalid at that line.
//! - [`LibraryBuilder`]: builds a Homebrew library (source tree plus taps)
//!   in a [`MemoryFs`].
//! - [`UnlistableDirs`]: a [`MemoryFs`] whose chosen directories refuse to
//!   be listed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use readall_kernel::vfs::{DirEntry, Filesystem};
use readall_kernel::{MemoryFs, OracleError, SyntaxOracle, SyntaxVerdict, TapId};

/// Marks the line a [`ScriptedOracle`] reports as broken.
pub const SYNTAX_ERROR_MARKER: &str = "# syntax-error";

/// Makes a [`ScriptedOracle`] fail to check the file at all.
pub const ORACLE_FAILURE_MARKER: &str = "# oracle-failure";

/// A small definition that passes.
pub const VALID_SOURCE: &str = "class Foo < Formula\n  url \"https://example.com/foo.tgz\"\nend\n";

/// A definition that fails at line 2.
pub const INVALID_SOURCE: &str = "class Foo < Formula\n  # syntax-error\n";

/// Oracle that judges files by marker comments.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    checked: Mutex<Vec<PathBuf>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths checked so far, in call order.
    pub fn checked(&self) -> Vec<PathBuf> {
        self.checked.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SyntaxOracle for ScriptedOracle {
    async fn check(&self, path: &Path, source: &[u8]) -> Result<SyntaxVerdict, OracleError> {
        if let Ok(mut checked) = self.checked.lock() {
            checked.push(path.to_path_buf());
        }

        let text = String::from_utf8_lossy(source);
        if text.contains(ORACLE_FAILURE_MARKER) {
            return Err(OracleError::Io(io::Error::other("scripted checker failure")));
        }
        let broken = text
            .lines()
            .position(|line| line.contains(SYNTAX_ERROR_MARKER));
        Ok(match broken {
            Some(index) => SyntaxVerdict::invalid(
                u32::try_from(index + 1).ok(),
                "syntax error, unexpected end-of-input, expecting `end'",
            ),
            None => SyntaxVerdict::Valid,
        })
    }
}

#[derive(Debug, Clone)]
enum Fixture {
    File { path: PathBuf, content: String },
    Link { target: PathBuf, link: PathBuf },
    Dir(PathBuf),
    InTap { tap: String, item: Box<Fixture> },
}

/// Builds an in-memory Homebrew library.
///
/// Tap names take any form [`TapId`] parses (`core`, `owner/repo`,
/// `owner/homebrew-repo`); paths inside a tap are relative to its root.
#[derive(Debug, Clone, Default)]
pub struct LibraryBuilder {
    fixtures: Vec<Fixture>,
}

impl LibraryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any file, relative to the library root.
    pub fn file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.fixtures.push(Fixture::File {
            path: path.into(),
            content: content.to_string(),
        });
        self
    }

    /// A file in the library's own source tree (`Homebrew/`).
    pub fn homebrew_file(self, relative: &str, content: &str) -> Self {
        self.file(Path::new("Homebrew").join(relative), content)
    }

    /// An installed tap with nothing in it.
    pub fn tap(self, tap: &str) -> Self {
        self.in_tap(tap, Fixture::Dir(PathBuf::new()))
    }

    /// `Formula/<name>.rb` in `tap`.
    pub fn definition(self, tap: &str, name: &str, content: &str) -> Self {
        self.in_tap(
            tap,
            Fixture::File {
                path: PathBuf::from(format!("Formula/{name}.rb")),
                content: content.to_string(),
            },
        )
    }

    /// `Aliases/<alias>` linking to `../Formula/<definition>.rb`.
    pub fn alias(self, tap: &str, alias: &str, definition: &str) -> Self {
        self.alias_link(tap, alias, &format!("../Formula/{definition}.rb"))
    }

    /// `Aliases/<alias>` linking to `target` verbatim.
    pub fn alias_link(self, tap: &str, alias: &str, target: &str) -> Self {
        self.in_tap(
            tap,
            Fixture::Link {
                target: PathBuf::from(target),
                link: Path::new("Aliases").join(alias),
            },
        )
    }

    /// `Aliases/<alias>` as a regular file instead of a link.
    pub fn plain_alias(self, tap: &str, alias: &str) -> Self {
        self.in_tap(
            tap,
            Fixture::File {
                path: Path::new("Aliases").join(alias),
                content: String::new(),
            },
        )
    }

    fn in_tap(mut self, tap: &str, item: Fixture) -> Self {
        self.fixtures.push(Fixture::InTap {
            tap: tap.to_string(),
            item: Box::new(item),
        });
        self
    }

    pub async fn build(self) -> io::Result<MemoryFs> {
        let fs = MemoryFs::new();
        for fixture in self.fixtures {
            apply(&fs, Path::new(""), fixture).await?;
        }
        Ok(fs)
    }
}

async fn apply(fs: &MemoryFs, base: &Path, fixture: Fixture) -> io::Result<()> {
    match fixture {
        Fixture::File { path, content } => fs.write(&base.join(path), content.as_bytes()).await,
        Fixture::Link { target, link } => fs.symlink(&target, &base.join(link)).await,
        Fixture::Dir(path) => fs.mkdir(&base.join(path)).await,
        Fixture::InTap { tap, item } => {
            let id: TapId = tap
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{e}")))?;
            Box::pin(apply(fs, &id.dir(), *item)).await
        }
    }
}

/// Wraps a [`MemoryFs`] so that listing any of `dirs` fails with
/// permission denied. Everything else passes through.
#[derive(Debug)]
pub struct UnlistableDirs {
    inner: MemoryFs,
    dirs: Vec<PathBuf>,
}

impl UnlistableDirs {
    pub fn new(inner: MemoryFs, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            inner,
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Filesystem for UnlistableDirs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.inner.write(path, data).await
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        if self.dirs.iter().any(|d| d == path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        self.inner.list(path).await
    }

    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        self.inner.stat(path).await
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.inner.mkdir(path).await
    }

    fn read_only(&self) -> bool {
        self.inner.read_only()
    }

    fn virtual_path(&self, absolute: &Path) -> Option<PathBuf> {
        self.inner.virtual_path(absolute)
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.read_link(path).await
    }

    async fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.inner.symlink(target, link).await
    }

    async fn lstat(&self, path: &Path) -> io::Result<DirEntry> {
        self.inner.lstat(path).await
    }
}
