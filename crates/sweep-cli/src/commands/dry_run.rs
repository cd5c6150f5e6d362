//! Plan the next cycle and print it without running any transformation

use crate::commands::{EngineOptions, build_engine};
use crate::console::{CliConsole, tier_label};
use colored::*;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use sweep_core::{
    CheckpointStore, FileCheckpointStore, InterruptManager, MemoryCheckpointStore, Project,
    StartMode, SweepConfig,
};

pub async fn execute(
    project: &Path,
    config: SweepConfig,
    mode: StartMode,
    file: Option<&Path>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    // Checkpoints written while planning stay in memory
    let dir = Project::new(project).resolve(&config.orchestrator.checkpoint_dir);
    let scratch = match FileCheckpointStore::new(dir).latest().await? {
        Some(latest) => MemoryCheckpointStore::seeded(latest),
        None => MemoryCheckpointStore::new(),
    };
    let options = EngineOptions {
        file,
        store: Some(Arc::new(scratch) as Arc<dyn CheckpointStore>),
    };
    let engine = build_engine(project, config, InterruptManager::new(), options)?;
    let plan = engine.dry_run(mode).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(ExitCode::SUCCESS);
    }

    let console = CliConsole::new(true);
    console.print_header("Sweep dry run");
    console.field("cycle", plan.cycle);
    for degraded in &plan.degraded {
        console.warn(&format!("Source unavailable: {}", degraded));
    }
    let Some(tier) = plan.tier else {
        console.success("Nothing to fix");
        return Ok(ExitCode::SUCCESS);
    };
    console.field("tier", tier_label(tier));
    console.field("queued", format!("{} files", plan.queued()));
    if plan.excluded > 0 {
        console.field("excluded", format!("{} files", plan.excluded));
    }
    if let Some(completion) = plan.completion {
        console.warn(&format!("Nothing can be scheduled: {}", completion));
    }

    for (index, batch) in plan.batches.iter().enumerate() {
        println!();
        println!("  {}", format!("Batch {}", index + 1).bold());
        for item in batch {
            let kinds: Vec<String> = item.violations.iter().map(|v| v.kind.to_string()).collect();
            println!("    {} {}", item.file.display(), kinds.join(", ").dimmed());
        }
    }
    Ok(ExitCode::SUCCESS)
}
