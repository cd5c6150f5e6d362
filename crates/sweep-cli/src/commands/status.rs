//! Latest checkpoint inspection

use crate::console::{CliConsole, tier_label};
use chrono::{DateTime, Local, Utc};
use std::path::Path;
use std::process::ExitCode;
use sweep_core::{CheckpointStore, FileCheckpointStore, Project, SweepConfig};

pub async fn execute(project: &Path, config: &SweepConfig, json: bool) -> anyhow::Result<ExitCode> {
    let project = Project::new(project);
    let dir = project.resolve(&config.orchestrator.checkpoint_dir);
    let store = FileCheckpointStore::new(dir.clone());
    let console = CliConsole::new(true);

    let Some(checkpoint) = store.latest().await? else {
        if json {
            println!("null");
        } else {
            console.warn(&format!("No checkpoints in {}", dir.display()));
        }
        return Ok(ExitCode::SUCCESS);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        return Ok(ExitCode::SUCCESS);
    }

    console.print_header("Sweep status");
    console.field("checkpoint", checkpoint.sequence);
    console.field("run", &checkpoint.run_id);
    console.field("cycle", checkpoint.cycle);
    console.field("written", local_time(checkpoint.created_at));
    console.field("running since", local_time(checkpoint.started_at));

    println!();
    for (tier, depth) in &checkpoint.queue_depth {
        console.field(&tier_label(*tier).to_string(), format!("{} files", depth));
    }

    let metrics = &checkpoint.metrics;
    println!();
    console.field("lint violations", metrics.lint_violations);
    console.field("build errors", metrics.build_errors);
    console.field("below coverage", metrics.files_below_coverage);
    if let Some(coverage) = metrics.coverage_percent {
        console.field("coverage", format!("{:.1}%", coverage));
    }
    console.field("max complexity", metrics.max_complexity);
    console.field("satd items", metrics.satd_count);

    let ledger = &checkpoint.ledger;
    println!();
    console.field("files fixed", ledger.completed().count());
    for (file, reason) in ledger.given_up() {
        let attempts = ledger.get(file).map(|r| r.attempts).unwrap_or(0);
        console.warn(&format!(
            "gave up on {} after {} attempts: {}",
            file.display(),
            attempts,
            reason.unwrap_or("no reason recorded")
        ));
    }
    Ok(ExitCode::SUCCESS)
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
