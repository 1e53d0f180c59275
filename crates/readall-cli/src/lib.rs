//! The `readall` command: argument parsing, wiring and rendering.
//!
//! The library half exists so the whole command can be driven from tests
//! with an in-memory library and a scripted oracle.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use readall_kernel::{
    AggregateResult, Filesystem, LocalFs, Readall, ReadallConfig, RubyOracle, SyntaxOracle,
    TapSelection, ValidationOptions,
};

/// Import all items from Homebrew's source tree and taps to check for
/// syntax errors and broken aliases.
#[derive(Debug, Clone, Parser)]
#[command(name = "readall", version)]
pub struct Args {
    /// Syntax-check all of Homebrew's own Ruby files as well as the taps.
    #[arg(long)]
    pub syntax: bool,

    /// Verify that every alias of each tap resolves to one of its definitions.
    #[arg(long)]
    pub aliases: bool,

    /// Print the full result as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Homebrew library directory [env: HOMEBREW_LIBRARY].
    #[arg(long, value_name = "DIR")]
    pub library: Option<PathBuf>,

    /// Ruby interpreter to check syntax with [env: HOMEBREW_RUBY_PATH].
    #[arg(long, value_name = "PATH")]
    pub ruby: Option<PathBuf>,

    /// Files and taps checked concurrently [env: READALL_JOBS].
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Report progress.
    #[arg(short, long, conflicts_with = "debug")]
    pub verbose: bool,

    /// Report every file and alias checked.
    #[arg(short, long)]
    pub debug: bool,

    /// Taps to check, e.g. `homebrew/core`. All installed taps if omitted.
    #[arg(value_name = "TAP")]
    pub taps: Vec<String>,
}

impl Args {
    /// `RUST_LOG` if set, otherwise a level picked by `--verbose`/`--debug`.
    pub fn log_filter(&self) -> EnvFilter {
        let level = if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }

    /// What to check. `--syntax` scans the source tree whether or not taps
    /// are named.
    pub fn options(&self) -> ValidationOptions {
        ValidationOptions {
            check_syntax: self.syntax,
            check_aliases: self.aliases,
            taps: TapSelection::from_names(self.taps.iter().cloned()),
        }
    }

    /// Settings given on the command line, to overlay on the loaded config.
    pub fn config_overrides(&self) -> ReadallConfig {
        ReadallConfig {
            library: self.library.clone(),
            ruby: self.ruby.clone(),
            jobs: self.jobs,
            ..ReadallConfig::default()
        }
    }
}

/// Run the command against the real library. Returns whether anything failed.
pub async fn run(args: &Args) -> Result<bool> {
    let config = ReadallConfig::load()
        .context("failed to load configuration")?
        .overlay(args.config_overrides());

    let library = config.library_dir().context(
        "no Homebrew library found; pass --library or set HOMEBREW_LIBRARY",
    )?;
    tracing::info!(library = %library.display(), "checking library");

    let fs: Arc<dyn Filesystem> = Arc::new(LocalFs::read_only(&library));
    let oracle = RubyOracle::locate(config.ruby.clone()).await?;

    // Unlocked handles: workers log to stderr while the run is in progress.
    let color = io::stderr().is_terminal();
    run_with(
        args,
        &config,
        fs,
        Arc::new(oracle),
        &mut io::stdout(),
        &mut Report::new(io::stderr(), color),
    )
    .await
}

/// Run the command with injected collaborators.
pub async fn run_with<O: Write, E: Write>(
    args: &Args,
    config: &ReadallConfig,
    fs: Arc<dyn Filesystem>,
    oracle: Arc<dyn SyntaxOracle>,
    out: &mut O,
    report: &mut Report<E>,
) -> Result<bool> {
    let engine = Readall::new(fs, oracle)
        .with_scan_settings(config.scan_settings())
        .with_jobs(config.jobs());

    let result = engine.run_validation(&args.options()).await?;

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &result).context("failed to write report")?;
        writeln!(out).context("failed to write report")?;
    } else {
        report.failures(&result).context("failed to write report")?;
    }
    Ok(result.any_failed)
}

/// Writes human-readable errors.
pub struct Report<W> {
    out: W,
    color: bool,
}

impl<W: Write> Report<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// One `Error:` line per diagnostic of every failed outcome.
    pub fn failures(&mut self, result: &AggregateResult) -> io::Result<()> {
        for outcome in result.failures() {
            for diagnostic in &outcome.diagnostics {
                self.error(&diagnostic.to_string())?;
            }
        }
        Ok(())
    }

    pub fn error(&mut self, message: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{} {message}", "Error:".red().bold())
        } else {
            writeln!(self.out, "Error: {message}")
        }
    }
}

/// Print a fatal error to stderr.
pub fn report_fatal(error: &anyhow::Error) {
    let stderr = io::stderr();
    let color = stderr.is_terminal();
    let mut report = Report::new(stderr.lock(), color);
    // Nothing sensible to do if stderr itself is gone.
    let _ = report.error(&format!("{error:#}"));
}
