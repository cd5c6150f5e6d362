//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sweep")]
#[command(about = "Sweep - quality-driven refactor orchestrator")]
#[command(
    long_about = r#"Sweep - quality-driven refactor orchestrator

USAGE:
  sweep run                      # Start a fresh run
  sweep run --resume             # Resume from the latest checkpoint
  sweep run --dry-run            # Show the next batches without fixing
  sweep run --file src/lib.rs    # Only fix one file
  sweep interactive              # Accept, reject or skip each fix
  sweep status                   # Show the latest checkpoint

Analyzers, gates and the transformation are configured as shell
commands in .sweep/config.toml under [commands]."#
)]
#[command(version)]
pub struct Cli {
    /// Project root to refactor
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub project: PathBuf,

    /// Configuration file (defaults to .sweep/config.toml in the project)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run unattended until the project is clean or a budget is spent
    Run {
        #[command(flatten)]
        start: StartArgs,

        #[command(flatten)]
        limits: LimitArgs,

        /// Analyze and plan one cycle, print the batches and stop
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Review each proposed fix before it is validated and committed
    Interactive {
        #[command(flatten)]
        start: StartArgs,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Show the state recorded in the latest checkpoint
    Status {
        /// Print the checkpoint as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub struct StartArgs {
    /// Continue from the latest checkpoint instead of starting fresh
    #[arg(long)]
    pub resume: bool,

    /// Only plan and fix this file (relative to the project or absolute)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

/// Overrides for the `[orchestrator]` section
#[derive(Args, Clone, Debug, Default)]
pub struct LimitArgs {
    /// Size of the transformation worker pool
    #[arg(long)]
    pub workers: Option<usize>,

    /// Maximum files per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Stop after this many analysis cycles
    #[arg(long)]
    pub max_cycles: Option<u32>,

    /// Stop after this much wall-clock time, e.g. "2h 30m"
    #[arg(long)]
    pub max_runtime: Option<String>,
}

impl LimitArgs {
    /// Keys as understood by the configuration loader
    pub fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(workers) = self.workers {
            overrides.insert("WORKERS".to_string(), workers.to_string());
        }
        if let Some(batch_size) = self.batch_size {
            overrides.insert("BATCH_SIZE".to_string(), batch_size.to_string());
        }
        if let Some(max_cycles) = self.max_cycles {
            overrides.insert("MAX_CYCLES".to_string(), max_cycles.to_string());
        }
        if let Some(max_runtime) = &self.max_runtime {
            overrides.insert("MAX_RUNTIME".to_string(), max_runtime.clone());
        }
        overrides
    }
}
