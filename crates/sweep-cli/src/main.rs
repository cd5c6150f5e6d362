//! Sweep CLI application
//!
//! Operator control surface for the refactor orchestrator.
//!
//! ```bash
//! sweep run                 # fresh unattended run
//! sweep run --resume        # continue from the latest checkpoint
//! sweep interactive         # review every proposed fix
//! sweep status --json       # inspect the latest checkpoint
//! ```
//!
//! Ctrl+C or SIGTERM stops a run at the next batch boundary. A second
//! Ctrl+C exits immediately.

#![allow(clippy::field_reassign_with_default)]

mod args;
mod commands;
mod console;
mod router;
mod signal_handler;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub use args::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match router::route(cli).await {
        Ok(code) => code,
        Err(e) => {
            console::CliConsole::new(false).error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins over `-v`
fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,sweep={level},sweep_core={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
