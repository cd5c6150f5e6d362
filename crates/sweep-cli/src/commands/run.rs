//! Unattended run

use crate::commands::{EngineOptions, build_engine};
use crate::console::{CliConsole, tier_label};
use crate::signal_handler::SignalHandler;
use std::path::Path;
use std::process::ExitCode;
use sweep_core::{
    AbortReason, InterruptManager, Orchestrator, OrchestratorState, RunOutcome, StartMode,
    SweepConfig,
};

/// Exit status for a run stopped by Ctrl+C
const EXIT_INTERRUPTED: u8 = 130;

pub async fn execute(
    project: &Path,
    config: SweepConfig,
    mode: StartMode,
    file: Option<&Path>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let console = CliConsole::new(!json);
    let interrupt = InterruptManager::new();
    let signals = SignalHandler::start(interrupt.clone())?;

    let options = EngineOptions {
        file,
        ..Default::default()
    };
    let engine = build_engine(project, config, interrupt, options)?;
    let mut orchestrator = Orchestrator::new(engine);

    // Report each new checkpoint while the run is going
    let mut handle = orchestrator.handle();
    let progress = tokio::spawn(async move {
        let mut last_sequence = None;
        while let Some(status) = handle.changed().await {
            if status.state != OrchestratorState::Analyzing || status.sequence == last_sequence {
                continue;
            }
            last_sequence = status.sequence;
            let tier = status
                .active_tier
                .map(|t| tier_label(t).to_string())
                .unwrap_or_else(|| "-".to_string());
            console.info(&format!(
                "checkpoint {} | cycle {} | {} | {} fixed, {} queued",
                status.sequence.unwrap_or_default(),
                status.cycle,
                tier,
                status.completed,
                status.queued()
            ));
        }
    });

    let summary = orchestrator.run(mode).await;
    progress.abort();
    signals.stop().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        CliConsole::new(true).print_summary(&summary);
    }

    Ok(match summary.outcome {
        RunOutcome::Complete { .. } => ExitCode::SUCCESS,
        RunOutcome::Aborted {
            abort: AbortReason::Interrupted,
        } => ExitCode::from(EXIT_INTERRUPTED),
        RunOutcome::Aborted {
            abort: AbortReason::RuntimeBudget | AbortReason::CycleBudget,
        } => ExitCode::from(2),
        RunOutcome::Aborted { .. } => ExitCode::FAILURE,
    })
}
