//! CLI commands

pub mod dry_run;
pub mod interactive;
pub mod run;
pub mod status;

use crate::args::LimitArgs;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use sweep_core::config::DEFAULT_CONFIG_FILE;
use sweep_core::config::loader::user_config_file;
use sweep_core::{
    CheckpointStore, ConfigLoader, Engine, InterruptManager, PathFilter, SweepConfig,
};

/// Defaults, then the user config, then the project config, then
/// `SWEEP_*` variables, then command line flags
pub fn load_config(
    project: &Path,
    config_file: Option<&Path>,
    limits: &LimitArgs,
) -> anyhow::Result<SweepConfig> {
    let mut loader = ConfigLoader::new().with_defaults();
    if let Some(user) = user_config_file() {
        loader = loader.with_file(user);
    }
    let project_file = match config_file {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            path.to_path_buf()
        }
        None => project.join(DEFAULT_CONFIG_FILE),
    };
    tracing::debug!(file = %project_file.display(), "Loading configuration");
    loader
        .with_file(project_file)
        .with_env()
        .with_overrides(limits.overrides())
        .load()
        .context("Failed to load configuration")
}

/// Where an engine keeps its checkpoints and which files it may touch
#[derive(Default)]
pub struct EngineOptions<'a> {
    /// Restrict planning to this one file
    pub file: Option<&'a Path>,
    /// Defaults to the checkpoint directory of the configuration
    pub store: Option<Arc<dyn CheckpointStore>>,
}

/// Engine wired to the configured commands
pub fn build_engine(
    project: &Path,
    config: SweepConfig,
    interrupt: InterruptManager,
    options: EngineOptions<'_>,
) -> anyhow::Result<Engine> {
    let mut builder = Engine::builder(project)
        .with_config(config)
        .with_configured_commands()?
        .with_interrupt(interrupt);
    if let Some(file) = options.file {
        tracing::info!(file = %file.display(), "Planning restricted to one file");
        builder = builder.with_filter(PathFilter::only(project, file)?);
    }
    if let Some(store) = options.store {
        builder = builder.with_store(store);
    }
    let engine = builder
        .build()
        .context("Failed to set up the orchestrator, is [commands].transform configured?")?;
    tracing::info!(
        project = %project.display(),
        workers = engine.settings().workers,
        batch_size = engine.settings().batch_size,
        "Orchestrator ready"
    );
    Ok(engine)
}
