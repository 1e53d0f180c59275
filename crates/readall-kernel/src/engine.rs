//! The `Readall` engine: wiring scanner, validators and aggregator together.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::aggregate::{AggregateResult, ResultAggregator, SharedAggregator};
use crate::error::ReadallError;
use crate::options::{TapSelection, ValidationOptions};
use crate::oracle::SyntaxOracle;
use crate::outcome::{Diagnostic, ValidationOutcome};
use crate::scanner::{FileScanner, ScanSettings, walk_error_diagnostic};
use crate::structure::TapStructureValidator;
use crate::syntax::SyntaxValidator;
use crate::tap::{TAPS_DIR, TapDirectory, TapListing, TapRegistry};
use crate::vfs::Filesystem;

/// Validation engine.
///
/// Every entry point returns an [`AggregateResult`] built fresh for that
/// call. Only unknown taps, bad tap names and an unreadable scan root abort
/// a run; everything else is reported.
pub struct Readall {
    fs: Arc<dyn Filesystem>,
    oracle: Arc<dyn SyntaxOracle>,
    registry: Arc<dyn TapRegistry>,
    scan: ScanSettings,
    jobs: usize,
}

impl Readall {
    /// Engine over a library filesystem, with taps found in its `Taps/`.
    pub fn new(fs: Arc<dyn Filesystem>, oracle: Arc<dyn SyntaxOracle>) -> Self {
        Self {
            registry: Arc::new(TapDirectory::new(fs.clone())),
            fs,
            oracle,
            scan: ScanSettings::default(),
            jobs: 1,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn TapRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_scan_settings(mut self, scan: ScanSettings) -> Self {
        self.scan = scan;
        self
    }

    /// Maximum concurrent checks. 1 (the default) runs everything inline.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    fn syntax_validator(&self) -> SyntaxValidator {
        SyntaxValidator::new(self.fs.clone(), self.oracle.clone())
    }

    /// Syntax-check every candidate under the scan root.
    pub async fn check_syntax(&self) -> Result<AggregateResult, ReadallError> {
        let scanner = FileScanner::new(self.fs.clone(), &self.scan)?;
        let validator = self.syntax_validator();
        let mut runner = Runner::new(self.jobs);
        let mut files = 0usize;

        let mut walk = scanner.walk().await?;
        while let Some(item) = walk.next().await {
            match item {
                Ok(path) => {
                    files += 1;
                    let validator = validator.clone();
                    let subject = path.clone();
                    runner
                        .submit(
                            move || worker_panicked_file(subject),
                            async move { validator.check_file(&path).await },
                        )
                        .await;
                }
                Err(e) => {
                    let diagnostic = walk_error_diagnostic(e);
                    let subject = match &diagnostic {
                        Diagnostic::UnreadableFile { file, .. } => file.clone(),
                        _ => scanner.root().to_path_buf(),
                    };
                    runner.record(ValidationOutcome::file(&subject, vec![diagnostic])).await;
                }
            }
        }

        let result = runner.finish().await;
        tracing::info!(
            root = %scanner.root().display(),
            files,
            failed = result.failures().count(),
            "syntax check finished"
        );
        Ok(result)
    }

    /// Validate the selected taps.
    ///
    /// A tap asked for by name must have definitions; with
    /// [`TapSelection::All`] a tap without any (one that only ships
    /// commands, say) passes.
    pub async fn check_taps(
        &self,
        selection: &TapSelection,
        check_aliases: bool,
    ) -> Result<AggregateResult, ReadallError> {
        let listing = self.resolve_taps(selection).await?;
        Ok(self.check_tap_refs(listing, selection, check_aliases).await)
    }

    async fn resolve_taps(&self, selection: &TapSelection) -> Result<TapListing, ReadallError> {
        self.registry.resolve(&selection.ids()?).await
    }

    async fn check_tap_refs(
        &self,
        listing: TapListing,
        selection: &TapSelection,
        check_aliases: bool,
    ) -> AggregateResult {
        let named = matches!(selection, TapSelection::Named(_));
        let validator =
            TapStructureValidator::new(self.fs.clone(), self.syntax_validator(), check_aliases)
                .empty_is_failure(named);
        let mut runner = Runner::new(self.jobs);

        for diagnostic in listing.unreadable {
            let subject = match &diagnostic {
                Diagnostic::UnreadableFile { file, .. } => file.clone(),
                _ => PathBuf::from(TAPS_DIR),
            };
            runner.record(ValidationOutcome::file(&subject, vec![diagnostic])).await;
        }

        let count = listing.taps.len();
        for tap in listing.taps {
            let validator = validator.clone();
            let subject = tap.clone();
            runner
                .submit(
                    move || {
                        ValidationOutcome::tap(
                            &subject.id,
                            vec![Diagnostic::CheckFailed {
                                file: subject.root,
                                cause: "worker panicked".to_string(),
                            }],
                        )
                    },
                    async move { validator.validate_ref(&tap).await },
                )
                .await;
        }

        let result = runner.finish().await;
        tracing::info!(
            taps = count,
            aliases = check_aliases,
            failed = result.failures().count(),
            "tap check finished"
        );
        result
    }

    /// Run the checks `options` asks for and merge their results.
    ///
    /// Tap names are resolved before anything is checked, so an unknown tap
    /// fails the run straight away.
    pub async fn run_validation(
        &self,
        options: &ValidationOptions,
    ) -> Result<AggregateResult, ReadallError> {
        let listing = self.resolve_taps(&options.taps).await?;

        let syntax = if options.check_syntax {
            self.check_syntax().await?
        } else {
            AggregateResult::default()
        };
        let taps = self
            .check_tap_refs(listing, &options.taps, options.check_aliases)
            .await;

        let result = syntax.merge(taps).sorted();
        tracing::info!(
            outcomes = result.outcomes.len(),
            any_failed = result.any_failed,
            "validation finished"
        );
        Ok(result)
    }
}

fn worker_panicked_file(path: PathBuf) -> ValidationOutcome {
    let diagnostic = Diagnostic::CheckFailed {
        file: path.clone(),
        cause: "worker panicked".to_string(),
    };
    ValidationOutcome::file(&path, vec![diagnostic])
}

/// Runs units of work inline or on a bounded pool.
enum Runner {
    Inline(ResultAggregator),
    Pool(Pool),
}

struct Pool {
    tasks: JoinSet<()>,
    limit: Arc<Semaphore>,
    shared: SharedAggregator,
    /// What to record for each task should it panic.
    on_panic: HashMap<Id, ValidationOutcome>,
}

impl Runner {
    fn new(jobs: usize) -> Self {
        if jobs <= 1 {
            Runner::Inline(ResultAggregator::new())
        } else {
            Runner::Pool(Pool {
                tasks: JoinSet::new(),
                limit: Arc::new(Semaphore::new(jobs)),
                shared: SharedAggregator::new(),
                on_panic: HashMap::new(),
            })
        }
    }

    async fn record(&mut self, outcome: ValidationOutcome) {
        match self {
            Runner::Inline(agg) => agg.record(outcome),
            Runner::Pool(pool) => pool.shared.record(outcome).await,
        }
    }

    async fn submit<P, W>(&mut self, on_panic: P, work: W)
    where
        P: FnOnce() -> ValidationOutcome,
        W: Future<Output = ValidationOutcome> + Send + 'static,
    {
        match self {
            Runner::Inline(agg) => agg.record(work.await),
            Runner::Pool(pool) => {
                let limit = pool.limit.clone();
                let shared = pool.shared.clone();
                let handle = pool.tasks.spawn(async move {
                    // The semaphore is never closed.
                    let _permit = limit.acquire_owned().await.ok();
                    let outcome = work.await;
                    shared.record(outcome).await;
                });
                pool.on_panic.insert(handle.id(), on_panic());
            }
        }
    }

    async fn finish(self) -> AggregateResult {
        match self {
            Runner::Inline(agg) => agg.finish(),
            Runner::Pool(mut pool) => {
                while let Some(joined) = pool.tasks.join_next_with_id().await {
                    match joined {
                        Ok((id, ())) => {
                            pool.on_panic.remove(&id);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "validation worker failed");
                            if let Some(outcome) = pool.on_panic.remove(&e.id()) {
                                pool.shared.record(outcome).await;
                            }
                        }
                    }
                }
                pool.shared.take().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleError, SyntaxVerdict};
    use crate::outcome::Scope;
    use crate::vfs::MemoryFs;
    use async_trait::async_trait;
    use std::path::Path;
    use crate::tap::TapId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Panics on `PANIC`, rejects `BAD`.
    struct Touchy;

    #[async_trait]
    impl SyntaxOracle for Touchy {
        async fn check(&self, _: &Path, source: &[u8]) -> Result<SyntaxVerdict, OracleError> {
            if source.starts_with(b"PANIC") {
                panic!("oracle blew up");
            }
            Ok(if source.starts_with(b"BAD") {
                SyntaxVerdict::invalid(Some(2), "bad")
            } else {
                SyntaxVerdict::Valid
            })
        }
    }

    async fn engine(files: &[(&str, &str)], jobs: usize) -> Readall {
        let fs = MemoryFs::new();
        for (path, body) in files {
            fs.write(Path::new(path), body.as_bytes()).await.unwrap();
        }
        Readall::new(Arc::new(fs), Arc::new(Touchy)).with_jobs(jobs)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_worker_is_a_failure_not_a_crash() {
        let engine = engine(
            &[
                ("Homebrew/a.rb", "ok"),
                ("Homebrew/b.rb", "PANIC"),
                ("Homebrew/c.rb", "ok"),
            ],
            4,
        )
        .await;

        let result = engine.check_syntax().await.unwrap();

        assert!(result.any_failed);
        let ok: Vec<_> = result.outcomes.iter().map(|o| (o.subject.as_str(), o.ok)).collect();
        assert_eq!(
            ok,
            vec![
                ("Homebrew/a.rb", true),
                ("Homebrew/b.rb", false),
                ("Homebrew/c.rb", true),
            ]
        );
    }

    #[tokio::test]
    async fn pool_and_inline_agree() {
        let mut files: Vec<(String, &str)> = (0..30)
            .map(|i| (format!("Homebrew/f{i:02}.rb"), if i % 7 == 3 { "BAD" } else { "ok" }))
            .collect();
        files.push(("Homebrew/vendor/skip.rb".to_string(), "BAD"));
        let files: Vec<(&str, &str)> = files.iter().map(|(p, b)| (p.as_str(), *b)).collect();

        let inline = engine(&files, 1).await.check_syntax().await.unwrap();
        let pooled = engine(&files, 8).await.check_syntax().await.unwrap();

        assert_eq!(inline, pooled);
        assert_eq!(inline.outcomes.len(), 30);
        assert_eq!(inline.failures().count(), 4);
    }

    #[tokio::test]
    async fn unknown_tap_aborts_before_syntax_check() {
        let engine = engine(&[("Homebrew/a.rb", "ok")], 1).await;
        let options = ValidationOptions {
            check_syntax: true,
            check_aliases: false,
            taps: TapSelection::from_names(["foo/bar"]),
        };

        let err = engine.run_validation(&options).await.unwrap_err();

        assert!(matches!(err, ReadallError::UnknownTap(_)), "{err}");
    }

    #[tokio::test]
    async fn syntax_and_taps_merge() {
        let engine = engine(
            &[
                ("Homebrew/a.rb", "ok"),
                ("Taps/homebrew/homebrew-core/Formula/x.rb", "BAD"),
            ],
            1,
        )
        .await;
        let options = ValidationOptions {
            check_syntax: true,
            check_aliases: true,
            taps: TapSelection::All,
        };

        let result = engine.run_validation(&options).await.unwrap();

        assert!(result.any_failed);
        let scopes: Vec<_> = result.outcomes.iter().map(|o| (o.scope, o.ok)).collect();
        assert_eq!(scopes, vec![(Scope::File, true), (Scope::Tap, false)]);
    }

    fn all_taps() -> ValidationOptions {
        ValidationOptions {
            check_syntax: false,
            check_aliases: true,
            taps: TapSelection::All,
        }
    }

    async fn core_and_command_tap() -> Readall {
        engine(
            &[
                ("Taps/homebrew/homebrew-core/Formula/wget.rb", "ok"),
                ("Taps/homebrew/homebrew-services/cmd/services.rb", "ok"),
            ],
            1,
        )
        .await
    }

    #[tokio::test]
    async fn tap_without_definitions_passes_when_checking_all() {
        let result = core_and_command_tap().await.run_validation(&all_taps()).await.unwrap();

        assert!(!result.any_failed, "{:?}", result.outcomes);
        let subjects: Vec<_> = result.outcomes.iter().map(|o| o.subject.as_str()).collect();
        assert_eq!(subjects, vec!["homebrew/core", "homebrew/services"]);
    }

    #[tokio::test]
    async fn named_tap_without_definitions_fails() {
        let options = ValidationOptions {
            taps: TapSelection::from_names(["homebrew/services"]),
            ..all_taps()
        };

        let result = core_and_command_tap().await.run_validation(&options).await.unwrap();

        assert!(result.any_failed);
        assert!(matches!(
            result.outcomes[0].diagnostics.as_slice(),
            [Diagnostic::EmptyTap { tap }] if tap.to_string() == "homebrew/services"
        ));
    }

    /// Counts how often the taps directory is enumerated.
    struct CountingRegistry {
        inner: TapDirectory,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TapRegistry for CountingRegistry {
        async fn installed(&self) -> Result<TapListing, ReadallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.installed().await
        }
    }

    #[tokio::test]
    async fn run_lists_taps_once() {
        let fs: Arc<dyn Filesystem> = Arc::new(MemoryFs::new());
        fs.write(Path::new("Taps/homebrew/homebrew-core/Formula/a.rb"), b"ok")
            .await
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CountingRegistry {
            inner: TapDirectory::new(fs.clone()),
            calls: calls.clone(),
        };
        let engine = Readall::new(fs, Arc::new(Touchy)).with_registry(Arc::new(registry));
        let core: TapId = "core".parse().unwrap();

        let result = engine
            .run_validation(&ValidationOptions {
                check_syntax: true,
                check_aliases: true,
                taps: TapSelection::Named(vec![core.to_string()]),
            })
            .await
            .unwrap();

        assert!(!result.any_failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
