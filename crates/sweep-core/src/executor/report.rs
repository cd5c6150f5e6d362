//! Per-item and per-batch execution outcomes

use crate::error::SweepResult;
use crate::executor::locks::FileGuard;
use crate::executor::preimage::PreImage;
use crate::planner::{BatchId, WorkItem};
use std::path::Path;
use std::time::Duration;

/// Local result of transforming one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Every violation for the file was resolved
    Succeeded,
    /// The file has already been restored to its pre-image
    Failed { reason: String },
}

/// One work item after execution, still owning its file lock
#[derive(Debug)]
pub struct ItemReport {
    pub item: WorkItem,
    pub outcome: ItemOutcome,
    pub duration: Duration,
    pre_image: PreImage,
    guard: FileGuard,
}

impl ItemReport {
    pub(crate) fn new(
        item: WorkItem,
        outcome: ItemOutcome,
        duration: Duration,
        pre_image: PreImage,
        guard: FileGuard,
    ) -> Self {
        Self {
            item,
            outcome,
            duration,
            pre_image,
            guard,
        }
    }

    pub fn file(&self) -> &Path {
        self.guard.file()
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == ItemOutcome::Succeeded
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Failed { reason } => Some(reason),
            ItemOutcome::Succeeded => None,
        }
    }

    pub fn pre_image(&self) -> &PreImage {
        &self.pre_image
    }

    /// Restore the file to its content at dispatch time
    pub async fn revert(&self) -> SweepResult<()> {
        self.pre_image.restore().await
    }
}

/// Every item of one batch after the join barrier
#[derive(Debug)]
pub struct BatchReport {
    pub batch: BatchId,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(ItemReport::succeeded)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|r| r.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|r| !r.succeeded())
    }

    pub fn files(&self) -> Vec<&Path> {
        self.items.iter().map(ItemReport::file).collect()
    }

    /// Restore every file of the batch, successful or not
    pub async fn revert_all(&self) -> SweepResult<()> {
        for report in &self.items {
            report.revert().await?;
        }
        Ok(())
    }
}
