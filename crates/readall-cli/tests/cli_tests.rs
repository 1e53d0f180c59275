//! Driving the `readall` command end to end with injected collaborators.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use readall_cli::{Args, Report, run_with};
use readall_kernel::{LocalFs, ReadallConfig, TapSelection};
use readall_testutil::{INVALID_SOURCE, LibraryBuilder, ScriptedOracle, VALID_SOURCE};

fn args(argv: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("readall").chain(argv.iter().copied())).unwrap()
}

struct Run {
    failed: bool,
    stdout: String,
    stderr: String,
}

async fn run(argv: &[&str], library: LibraryBuilder) -> Run {
    let fs = Arc::new(library.build().await.unwrap());
    let mut stdout = Vec::<u8>::new();
    let mut report = Report::new(Vec::<u8>::new(), false);

    let failed = run_with(
        &args(argv),
        &ReadallConfig::default(),
        fs,
        Arc::new(ScriptedOracle::new()),
        &mut stdout,
        &mut report,
    )
    .await
    .unwrap();

    Run {
        failed,
        stdout: String::from_utf8(stdout).unwrap(),
        stderr: String::from_utf8(report.into_inner()).unwrap(),
    }
}

fn healthy_library() -> LibraryBuilder {
    LibraryBuilder::new()
        .homebrew_file("cmd/readall.rb", VALID_SOURCE)
        .definition("core", "wget", VALID_SOURCE)
        .alias("core", "gnu-wget", "wget")
}

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn flags_map_to_options() {
    let parsed = args(&["--syntax", "--aliases", "-j", "4"]);
    let options = parsed.options();

    assert!(options.check_syntax);
    assert!(options.check_aliases);
    assert_eq!(options.taps, TapSelection::All);
    assert_eq!(parsed.config_overrides().jobs, Some(4));
}

#[test]
fn named_taps_keep_the_syntax_check() {
    let options = args(&["--syntax", "homebrew/core", "foo/bar"]).options();

    assert!(options.check_syntax);
    assert_eq!(
        options.taps,
        TapSelection::Named(vec!["homebrew/core".into(), "foo/bar".into()])
    );
}

#[tokio::test]
async fn syntax_runs_alongside_named_taps() {
    let library = healthy_library().homebrew_file("cmd/broken.rb", INVALID_SOURCE);

    let run = run(&["--syntax", "homebrew/core"], library).await;

    assert!(run.failed);
    assert!(
        run.stderr
            .lines()
            .any(|l| l.starts_with("Error: Homebrew/cmd/broken.rb:2")),
        "{}",
        run.stderr
    );
}

#[test]
fn verbose_and_debug_conflict() {
    let err = Args::try_parse_from(["readall", "-v", "-d"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn command_line_overrides_config() {
    let file = ReadallConfig {
        library: Some("/from/file".into()),
        jobs: Some(2),
        ..ReadallConfig::default()
    };
    let merged = file.overlay(args(&["--library", "/from/flag"]).config_overrides());

    assert_eq!(merged.library.as_deref(), Some(Path::new("/from/flag")));
    assert_eq!(merged.jobs(), 2);
}

// ============================================================================
// Rendering and exit status
// ============================================================================

#[tokio::test]
async fn clean_library_prints_nothing() {
    let run = run(&["--syntax", "--aliases"], healthy_library()).await;

    assert!(!run.failed);
    assert!(run.stdout.is_empty());
    assert!(run.stderr.is_empty());
}

#[tokio::test]
async fn every_problem_gets_an_error_line() {
    let library = healthy_library()
        .homebrew_file("cmd/broken.rb", INVALID_SOURCE)
        .alias_link("core", "nowhere", "../Formula/gone.rb");

    let run = run(&["--syntax", "--aliases"], library).await;

    assert!(run.failed);
    let lines: Vec<&str> = run.stderr.lines().collect();
    assert_eq!(lines.len(), 2, "{}", run.stderr);
    assert!(lines[0].starts_with("Error: Homebrew/cmd/broken.rb:2: syntax error"));
    assert!(lines[1].starts_with("Error: broken alias homebrew/core/nowhere"));
}

#[tokio::test]
async fn json_report_goes_to_stdout() {
    let library = healthy_library().homebrew_file("cmd/broken.rb", INVALID_SOURCE);

    let run = run(&["--syntax", "--json"], library).await;

    assert!(run.failed);
    assert!(run.stderr.is_empty());
    let json: serde_json::Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(json["any_failed"], true);
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_tap_is_an_error() {
    let fs = Arc::new(healthy_library().build().await.unwrap());
    let mut report = Report::new(Vec::<u8>::new(), false);

    let err = run_with(
        &args(&["foo/bar"]),
        &ReadallConfig::default(),
        fs,
        Arc::new(ScriptedOracle::new()),
        &mut Vec::<u8>::new(),
        &mut report,
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "no such tap: foo/bar");
}

#[tokio::test]
async fn works_against_a_real_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("Homebrew/cmd")).unwrap();
    std::fs::write(root.join("Homebrew/cmd/ok.rb"), VALID_SOURCE).unwrap();
    let formula = root.join("Taps/foo/homebrew-bar/Formula");
    std::fs::create_dir_all(&formula).unwrap();
    std::fs::write(formula.join("baz.rb"), VALID_SOURCE).unwrap();

    let mut stdout = Vec::<u8>::new();
    let mut report = Report::new(Vec::<u8>::new(), false);
    let failed = run_with(
        &args(&["--syntax", "--aliases"]),
        &ReadallConfig::default(),
        Arc::new(LocalFs::read_only(root)),
        Arc::new(ScriptedOracle::new()),
        &mut stdout,
        &mut report,
    )
    .await
    .unwrap();

    assert!(!failed);
    assert!(report.into_inner().is_empty());
}
