//! Core batch executor implementation

use crate::error::{SweepError, SweepResult};
use crate::executor::locks::FileLockTable;
use crate::executor::preimage::PreImage;
use crate::executor::report::{BatchReport, ItemOutcome, ItemReport};
use crate::executor::transform::{TransformOutcome, Transformer};
use crate::planner::{Batch, WorkItem, WorkItemState};
use crate::violation::Project;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Runs batches of work items over a fixed-size worker pool
pub struct BatchExecutor {
    transformer: Arc<dyn Transformer>,
    /// Worker pool permits
    workers: Arc<Semaphore>,
    locks: FileLockTable,
}

impl BatchExecutor {
    pub fn new(transformer: Arc<dyn Transformer>, workers: usize) -> Self {
        Self {
            transformer,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            locks: FileLockTable::new(),
        }
    }

    /// Execute every item of the batch and wait for all of them.
    ///
    /// Items are dispatched in priority order; the pool permits are handed
    /// out first come first served, so completion order may differ. An
    /// error is returned only when the working tree cannot be read or
    /// restored, in which case the run cannot continue safely.
    pub async fn execute(&self, project: &Project, batch: &Batch) -> SweepResult<BatchReport> {
        tracing::info!(batch = %batch.id(), items = batch.len(), "Executing batch");

        let runs: Vec<_> = batch
            .items()
            .iter()
            .map(|item| self.run_item(project, item.clone()))
            .collect();
        let results = futures::future::join_all(runs).await;

        let mut items = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(report) => items.push(report),
                Err(e) => {
                    tracing::error!(error = %e, "Work item hit a fatal error");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            // Leave the tree as it was before the batch
            for report in &items {
                if let Err(restore) = report.revert().await {
                    tracing::error!(
                        file = %report.file().display(),
                        error = %restore,
                        "Failed to restore file after fatal error"
                    );
                }
            }
            return Err(e);
        }

        Ok(BatchReport {
            batch: batch.id(),
            items,
        })
    }

    /// Execute a single item outside of a batch
    pub async fn execute_item(&self, project: &Project, item: WorkItem) -> SweepResult<ItemReport> {
        self.run_item(project, item).await
    }

    async fn run_item(&self, project: &Project, mut item: WorkItem) -> SweepResult<ItemReport> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|_| SweepError::Cancelled)?;
        let guard = self.locks.acquire(&item.file).await;

        item.state = WorkItemState::InFlight;
        let path = project.resolve(&item.file);
        let pre_image = PreImage::capture(&path).await?;

        let started = Instant::now();
        let outcome = match self.transform_all(project, &item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(restore) = pre_image.restore().await {
                    tracing::error!(
                        file = %item.file.display(),
                        error = %restore,
                        "Failed to restore file after fatal error"
                    );
                }
                return Err(e);
            }
        };
        let duration = started.elapsed();

        let outcome = match outcome {
            TransformOutcome::Resolved => {
                item.state = WorkItemState::Succeeded;
                tracing::debug!(file = %item.file.display(), "Work item resolved");
                ItemOutcome::Succeeded
            }
            TransformOutcome::Unresolved { reason } => {
                pre_image.restore().await?;
                item.state = WorkItemState::Failed;
                tracing::warn!(
                    file = %item.file.display(),
                    reason = %reason,
                    "Work item failed, file restored"
                );
                ItemOutcome::Failed { reason }
            }
        };

        Ok(ItemReport::new(item, outcome, duration, pre_image, guard))
    }

    /// Apply the transformation to each violation in order, stopping at the
    /// first one left unresolved. Fatal errors (the working tree itself
    /// failing) propagate; anything else fails only this item.
    async fn transform_all(
        &self,
        project: &Project,
        item: &WorkItem,
    ) -> SweepResult<TransformOutcome> {
        for violation in &item.violations {
            match self.transformer.transform(project, violation).await {
                Ok(TransformOutcome::Resolved) => {}
                Ok(unresolved) => return Ok(unresolved),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    return Ok(TransformOutcome::unresolved(format!(
                        "{} failed on {}: {}",
                        self.transformer.name(),
                        violation.kind,
                        e
                    )));
                }
            }
        }
        Ok(TransformOutcome::Resolved)
    }
}
