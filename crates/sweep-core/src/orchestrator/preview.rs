//! Analyze and plan one cycle without touching the working tree

use crate::error::SweepResult;
use crate::metrics::QualityMetrics;
use crate::orchestrator::engine::Engine;
use crate::orchestrator::machine::StartMode;
use crate::planner::{CompletionReason, Tier, WorkItem};
use serde::Serialize;

/// The batches a run would dispatch next
#[derive(Debug, Clone, Serialize)]
pub struct DryRun {
    pub sequence: u64,
    pub cycle: u64,
    pub tier: Option<Tier>,
    /// Queue split into batches, in dispatch order
    pub batches: Vec<Vec<WorkItem>>,
    /// Files of the active tier left out by skips or give-ups
    pub excluded: usize,
    /// `source: reason` for each source that could not be queried
    pub degraded: Vec<String>,
    pub metrics: QualityMetrics,
    /// Set when nothing would be dispatched
    pub completion: Option<CompletionReason>,
}

impl DryRun {
    pub fn queued(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

impl Engine {
    /// Run the Analyzing and Planning phases once and report the queue.
    ///
    /// No transformation runs and no file is written. Starting a run still
    /// appends its initial checkpoint, so build the engine over a
    /// [`MemoryCheckpointStore`](crate::checkpoints::MemoryCheckpointStore)
    /// seeded from the real store's latest checkpoint.
    pub async fn dry_run(&self, mode: StartMode) -> SweepResult<DryRun> {
        let mut ctx = self.begin(mode).await?;
        self.analyze(&mut ctx).await;
        let completion = self.plan(&mut ctx);

        let tier = ctx.plan.tier;
        let excluded = ctx.plan.excluded;
        let mut batches = Vec::new();
        loop {
            let items = ctx.plan.take_batch(self.settings.batch_size);
            if items.is_empty() {
                break;
            }
            batches.push(items);
        }

        let dry_run = DryRun {
            sequence: ctx.sequence(),
            cycle: ctx.checkpoint.cycle,
            tier,
            batches,
            excluded,
            degraded: ctx
                .collection
                .degraded
                .iter()
                .map(|d| format!("{}: {}", d.source, d.reason))
                .collect(),
            metrics: ctx.checkpoint.metrics.clone(),
            completion,
        };
        tracing::info!(
            tier = ?dry_run.tier,
            batches = dry_run.batches.len(),
            queued = dry_run.queued(),
            "Dry run planned"
        );
        Ok(dry_run)
    }
}
