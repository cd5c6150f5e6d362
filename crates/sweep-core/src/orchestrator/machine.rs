//! Phase operations shared by both drivers
//!
//! All resumable state lives in the [`RunContext`]'s checkpoint; the drivers
//! only add the transient batch being worked on.

use crate::checkpoints::Checkpoint;
use crate::checkpoints::storage::next_sequence;
use crate::error::SweepResult;
use crate::metrics::{QualityMetrics, RefactorProgress};
use crate::orchestrator::engine::Engine;
use crate::orchestrator::observer::CommitEvent;
use crate::orchestrator::state::{AbortReason, OrchestratorState, RunOutcome};
use crate::orchestrator::status::{FileNote, StatusReport};
use crate::planner::{Batch, BatchId, CompletionReason, Plan, WorkItem};
use crate::validation::ValidationReport;
use crate::violation::Collection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Instrument;

/// How a run begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// New run; existing checkpoints only determine the next sequence number
    #[default]
    Fresh,
    /// Continue from the latest checkpoint, or start fresh if there is none
    Resume,
}

/// Explicit state of one run, passed through every transition
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Last durable checkpoint plus in-memory outcomes since
    pub checkpoint: Checkpoint,
    pub collection: Collection,
    pub plan: Plan,
    /// Analyzing cycles run by this invocation
    pub cycles: u32,
    batches: u64,
    started: Instant,
}

impl RunContext {
    pub fn new(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint,
            collection: Collection::default(),
            plan: Plan {
                tier: None,
                items: Vec::new(),
                excluded: 0,
                depth: Default::default(),
            },
            cycles: 0,
            batches: 0,
            started: Instant::now(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.checkpoint.sequence
    }
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub sequence: Option<u64>,
    pub cycles: u64,
    pub completed: Vec<PathBuf>,
    pub skipped: Vec<FileNote>,
    pub given_up: Vec<FileNote>,
    pub metrics: QualityMetrics,
    pub progress: Option<RefactorProgress>,
}

impl RunSummary {
    pub(crate) fn new(outcome: RunOutcome, ctx: Option<&RunContext>, engine: &Engine) -> Self {
        match ctx {
            Some(ctx) => {
                let ledger = &ctx.checkpoint.ledger;
                Self {
                    outcome,
                    sequence: Some(ctx.sequence()),
                    cycles: ctx.checkpoint.cycle,
                    completed: ledger.completed().map(Path::to_path_buf).collect(),
                    skipped: notes(ledger.skipped()),
                    given_up: notes(ledger.given_up()),
                    metrics: ctx.checkpoint.metrics.clone(),
                    progress: Some(engine.progress(ctx)),
                }
            }
            None => Self {
                outcome,
                sequence: None,
                cycles: 0,
                completed: Vec::new(),
                skipped: Vec::new(),
                given_up: Vec::new(),
                metrics: QualityMetrics::default(),
                progress: None,
            },
        }
    }
}

fn notes<'a>(entries: impl Iterator<Item = (&'a Path, Option<&'a str>)>) -> Vec<FileNote> {
    entries
        .map(|(file, reason)| FileNote {
            file: file.to_path_buf(),
            reason: reason.map(str::to_string),
        })
        .collect()
}

impl Engine {
    /// Load or create the checkpoint a run starts from
    pub async fn begin(&self, mode: StartMode) -> SweepResult<RunContext> {
        if mode == StartMode::Resume {
            if let Some(checkpoint) = self.store.latest().await? {
                tracing::info!(
                    sequence = checkpoint.sequence,
                    run_id = %checkpoint.run_id,
                    "Resuming from checkpoint"
                );
                return Ok(RunContext::new(checkpoint));
            }
            tracing::info!("No checkpoint to resume from, starting fresh");
        }

        let checkpoint = Checkpoint::initial(next_sequence(self.store.latest_sequence().await?));
        self.store.append(&checkpoint).await?;
        tracing::info!(
            sequence = checkpoint.sequence,
            run_id = %checkpoint.run_id,
            "Starting fresh run"
        );
        Ok(RunContext::new(checkpoint))
    }

    /// Analyzing: collect a fresh violation set. Never fails.
    pub async fn analyze(&self, ctx: &mut RunContext) {
        let cycle = ctx.checkpoint.cycle + 1;

        ctx.checkpoint.ledger.begin_cycle();
        let collection = self
            .collector
            .collect(&self.project, ctx.checkpoint.revision())
            .instrument(tracing::info_span!("analyzing", cycle))
            .await;
        for degradation in &collection.degraded {
            tracing::warn!(
                source = %degradation.source,
                reason = %degradation.reason,
                "Violation source degraded"
            );
        }

        let coverage = match ctx.checkpoint.metrics.coverage_percent {
            Some(percent) => Some(percent),
            None => self.validator.measure_baseline(&self.project).await,
        };
        let metrics = QualityMetrics::from_collection(&collection, coverage);
        if ctx.checkpoint.cycle == 0 {
            ctx.checkpoint.baseline = metrics.clone();
        }
        ctx.checkpoint.metrics = metrics;
        ctx.checkpoint.cycle = cycle;
        ctx.cycles += 1;
        ctx.collection = collection;
    }

    /// Planning: rebuild the queue. Returns why the run is complete when
    /// nothing can be scheduled.
    pub fn plan(&self, ctx: &mut RunContext) -> Option<CompletionReason> {
        ctx.plan = self
            .planner
            .plan(&ctx.collection, &ctx.checkpoint.ledger.exclusions());

        let ledger = &ctx.checkpoint.ledger;
        tracing::info!(
            cycle = ctx.checkpoint.cycle,
            sequence = ctx.checkpoint.sequence,
            tier = ?ctx.plan.tier,
            queued = ctx.plan.items.len(),
            completed = ledger.completed().count(),
            skipped = ledger.skipped().count(),
            given_up = ledger.given_up().count(),
            "Planned cycle"
        );
        ctx.plan.completion()
    }

    /// Pop the next slice of the queue and dispatch it
    pub fn next_batch(&self, ctx: &mut RunContext) -> Batch {
        ctx.batches += 1;
        let items = ctx.plan.take_batch(self.settings.batch_size);
        Batch::dispatch(BatchId(ctx.batches), items)
    }

    /// Interrupt and runtime budget, checked only between batches
    pub fn boundary_check(&self, ctx: &RunContext) -> Option<AbortReason> {
        if self.interrupt.is_interrupted() {
            return Some(AbortReason::Interrupted);
        }
        match self.settings.max_runtime {
            Some(budget) if ctx.started.elapsed() >= budget => Some(AbortReason::RuntimeBudget),
            _ => None,
        }
    }

    pub fn cycle_budget_spent(&self, ctx: &RunContext) -> bool {
        self.settings
            .max_cycles
            .is_some_and(|max| ctx.cycles >= max)
    }

    pub async fn validate(&self, ctx: &RunContext, files: &[PathBuf]) -> ValidationReport {
        self.validator
            .validate(&self.project, files, ctx.checkpoint.metrics.coverage_percent)
            .instrument(tracing::info_span!(
                "validating",
                sequence = ctx.checkpoint.sequence
            ))
            .await
    }

    /// Checkpointing: durably record committed items, then notify observers.
    ///
    /// On error the context is left at the previous checkpoint.
    pub async fn commit(
        &self,
        ctx: &mut RunContext,
        items: &[WorkItem],
        coverage: Option<f64>,
    ) -> SweepResult<u64> {
        let mut next = ctx.checkpoint.successor();
        for item in items {
            next.ledger.record_success(&item.file, item.tier());
        }
        next.queue = ctx.plan.items.clone();
        next.queue_depth = ctx.plan.depth.clone();
        if coverage.is_some() {
            next.metrics.coverage_percent = coverage;
        }

        self.store.append(&next).await?;
        ctx.checkpoint = next;
        tracing::info!(
            sequence = ctx.checkpoint.sequence,
            files = items.len(),
            "Checkpoint written"
        );

        if let Some(first) = items.first() {
            let event = CommitEvent {
                sequence: ctx.checkpoint.sequence,
                tier: first.tier(),
                files: items.iter().map(|item| item.file.clone()).collect(),
            };
            for observer in &self.observers {
                if let Err(e) = observer.on_commit(&event).await {
                    tracing::warn!(
                        observer = observer.name(),
                        error = %e,
                        "Commit observer failed"
                    );
                }
            }
        }
        Ok(ctx.checkpoint.sequence)
    }

    /// Count a failed attempt for the file and skip it for this cycle
    pub fn record_failure(&self, ctx: &mut RunContext, file: &Path, reason: &str) {
        let gave_up = ctx.checkpoint.ledger.record_failure(
            file,
            reason,
            self.settings.max_attempts_per_file,
        );
        if gave_up {
            tracing::warn!(file = %file.display(), reason, "Giving up on file");
        } else {
            tracing::warn!(file = %file.display(), reason, "Skipping file until next cycle");
        }
    }

    pub fn record_skip(&self, ctx: &mut RunContext, file: &Path, reason: &str) {
        ctx.checkpoint.ledger.record_skip(file, reason);
        tracing::warn!(file = %file.display(), reason, "Skipping file until next cycle");
    }

    pub fn progress(&self, ctx: &RunContext) -> RefactorProgress {
        RefactorProgress::calculate(
            &ctx.checkpoint.baseline,
            &ctx.checkpoint.metrics,
            ctx.plan.tier,
            self.profile(),
        )
    }

    /// Publish the current state to every [`OrchestratorHandle`]
    pub fn publish(
        &self,
        state: OrchestratorState,
        ctx: Option<&RunContext>,
        outcome: Option<&RunOutcome>,
    ) {
        let mut report = StatusReport {
            state,
            outcome: outcome.cloned(),
            ..StatusReport::default()
        };
        if let Some(ctx) = ctx {
            let ledger = &ctx.checkpoint.ledger;
            report.cycle = ctx.checkpoint.cycle;
            report.sequence = Some(ctx.checkpoint.sequence);
            report.active_tier = ctx.plan.tier;
            report.queue_depth = ctx.plan.depth.clone();
            report.completed = ledger.completed().count();
            report.skipped = notes(ledger.skipped());
            report.given_up = notes(ledger.given_up());
            report.degraded = ctx
                .collection
                .degraded
                .iter()
                .map(|d| d.source.clone())
                .collect();
            report.progress = Some(self.progress(ctx));
        }
        self.status.send_replace(report);
    }
}
