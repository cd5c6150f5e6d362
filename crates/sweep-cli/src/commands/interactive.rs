//! Operator-driven session loop

use crate::commands::{EngineOptions, build_engine};
use crate::console::{CliConsole, tier_label};
use crate::signal_handler::SignalHandler;
use anyhow::Context;
use colored::*;
use dialoguer::{Select, theme::ColorfulTheme};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::ExitCode;
use sweep_core::{
    InteractiveDriver, InterruptManager, RunOutcome, Session, SessionOutcome, StartMode,
    SweepConfig,
};

/// Lines of the proposal shown before the decision prompt
const PREVIEW_LINES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accept,
    Reject,
    Skip,
    Quit,
}

impl Decision {
    const ALL: [Decision; 4] = [Self::Accept, Self::Reject, Self::Skip, Self::Quit];

    fn label(&self) -> &'static str {
        match self {
            Self::Accept => "Accept - validate and commit",
            Self::Reject => "Reject - restore, counts as an attempt",
            Self::Skip => "Skip - restore, try again next cycle",
            Self::Quit => "Quit - restore and stop",
        }
    }
}

pub async fn execute(
    project: &Path,
    config: SweepConfig,
    mode: StartMode,
    file: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    anyhow::ensure!(
        console::user_attended(),
        "interactive mode needs a terminal, use `sweep run` instead"
    );
    let console = CliConsole::new(true);
    let interrupt = InterruptManager::new();
    let signals = SignalHandler::start(interrupt.clone())?;

    let options = EngineOptions {
        file,
        ..Default::default()
    };
    let engine = build_engine(project, config, interrupt, options)?;
    let mut driver = InteractiveDriver::start(engine, mode)
        .await
        .context("Failed to start interactive run")?;

    while let Some(session) = driver.open_session().await? {
        show_proposal(&console, &session).await?;

        let decision = tokio::task::block_in_place(prompt)?;
        let outcome = match decision {
            Decision::Accept => session.accept().await?,
            Decision::Reject => session.reject().await?,
            Decision::Skip => session.skip().await?,
            Decision::Quit => {
                session.skip().await?;
                driver.stop();
                break;
            }
        };

        match outcome {
            SessionOutcome::Committed { sequence } => {
                console.success(&format!("Committed as checkpoint {}", sequence));
            }
            SessionOutcome::ValidationFailed { report } => {
                console.warn(&format!("Reverted: {}", report.summary()));
            }
            SessionOutcome::Rejected => console.warn("Rejected and restored"),
            SessionOutcome::Skipped => console.info("Skipped until the next cycle"),
        }
    }
    signals.stop().await;

    let summary = driver.summary();
    console.print_summary(&summary);
    Ok(match summary.outcome {
        RunOutcome::Complete { .. } => ExitCode::SUCCESS,
        RunOutcome::Aborted { .. } => ExitCode::FAILURE,
    })
}

fn prompt() -> anyhow::Result<Decision> {
    let items: Vec<&str> = Decision::ALL.iter().map(Decision::label).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Apply this fix?")
        .items(&items)
        .default(0)
        .interact()
        .context("selection error")?;
    Ok(Decision::ALL[selection])
}

async fn show_proposal(console: &CliConsole, session: &Session<'_>) -> anyhow::Result<()> {
    let item = session.item();
    console.print_header(&format!("{}", session.file().display()));
    console.field("tier", tier_label(item.tier()));
    for violation in &item.violations {
        let evidence = violation.evidence.as_deref().unwrap_or("");
        console.field(
            violation.kind.as_str(),
            format!(
                "severity {:.1} x{} {}",
                violation.severity,
                violation.occurrences,
                evidence.dimmed()
            ),
        );
    }

    let before = session
        .pre_image()
        .content()
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default();
    let after = session
        .proposed_content()
        .await?
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();

    println!();
    for line in changed_lines(&before, &after).into_iter().take(PREVIEW_LINES) {
        println!("  {}", line);
    }
    println!();
    Ok(())
}

/// Lines only present on one side, in file order
fn changed_lines(before: &str, after: &str) -> Vec<ColoredString> {
    let old: BTreeSet<&str> = before.lines().collect();
    let new: BTreeSet<&str> = after.lines().collect();

    let removed = before
        .lines()
        .filter(|l| !new.contains(l))
        .map(|l| format!("- {}", l).red());
    let added = after
        .lines()
        .filter(|l| !old.contains(l))
        .map(|l| format!("+ {}", l).green());
    removed.chain(added).collect()
}
