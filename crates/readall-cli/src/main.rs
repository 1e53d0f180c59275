//! readall entry point.
//!
//! ```bash
//! readall --syntax --aliases
//! readall --aliases homebrew/core
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*};

use readall_cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(args.log_filter())
        .init();

    match readall_cli::run(&args).await {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::FAILURE,
        Err(e) => {
            readall_cli::report_fatal(&e);
            ExitCode::FAILURE
        }
    }
}
