//! CLI console utilities

use colored::*;
use sweep_core::{AbortReason, RunOutcome, RunSummary, Tier};

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.len()).dimmed());
    }

    /// Labelled value line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<18} {}", format!("{}:", label).dimmed(), value);
    }

    pub fn print_summary(&self, summary: &RunSummary) {
        self.print_header("Sweep run");
        match &summary.outcome {
            RunOutcome::Complete { completion } => {
                self.success(&format!("Complete: {}", completion));
            }
            RunOutcome::Aborted {
                abort: AbortReason::Fatal { message },
            } => self.error(&format!("Aborted: {}", message)),
            RunOutcome::Aborted { abort } => self.warn(&format!("Stopped: {}", abort)),
        }

        if let Some(sequence) = summary.sequence {
            self.field("checkpoint", sequence);
        }
        self.field("cycles", summary.cycles);
        self.field("files fixed", summary.completed.len());
        if let Some(progress) = &summary.progress {
            self.field(
                "progress",
                format!("{:.1}%", progress.overall_completion_percent),
            );
        }

        if !summary.skipped.is_empty() {
            println!();
            println!("  {}", "Skipped this cycle".yellow());
            for note in &summary.skipped {
                println!(
                    "    {} {}",
                    note.file.display(),
                    note.reason.as_deref().unwrap_or("").dimmed()
                );
            }
        }
        if !summary.given_up.is_empty() {
            println!();
            println!("  {}", "Given up".red());
            for note in &summary.given_up {
                println!(
                    "    {} {}",
                    note.file.display(),
                    note.reason.as_deref().unwrap_or("").dimmed()
                );
            }
        }
    }
}

pub fn tier_label(tier: Tier) -> ColoredString {
    let label = format!("[{}] {}", tier.rank(), tier);
    match tier {
        Tier::Lint => label.red(),
        Tier::BuildError => label.magenta(),
        Tier::LowCoverage => label.yellow(),
        Tier::ExtremeQuality => label.cyan(),
    }
}
