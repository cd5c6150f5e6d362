//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use std::process::ExitCode;
use sweep_core::StartMode;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> anyhow::Result<ExitCode> {
    let project = cli.project.clone();
    let config_file = cli.config.clone();

    match cli.command {
        Commands::Run {
            start,
            limits,
            dry_run,
            json,
        } => {
            let config = commands::load_config(&project, config_file.as_deref(), &limits)?;
            let mode = start_mode(start.resume);
            let file = start.file.as_deref();
            if dry_run {
                commands::dry_run::execute(&project, config, mode, file, json).await
            } else {
                commands::run::execute(&project, config, mode, file, json).await
            }
        }
        Commands::Interactive { start, limits } => {
            let config = commands::load_config(&project, config_file.as_deref(), &limits)?;
            let file = start.file.as_deref();
            commands::interactive::execute(&project, config, start_mode(start.resume), file)
                .await
        }
        Commands::Status { json } => {
            let config =
                commands::load_config(&project, config_file.as_deref(), &Default::default())?;
            commands::status::execute(&project, &config, json).await
        }
    }
}

fn start_mode(resume: bool) -> StartMode {
    if resume {
        StartMode::Resume
    } else {
        StartMode::Fresh
    }
}
