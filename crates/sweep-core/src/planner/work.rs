//! Work items and batches

use crate::planner::tier::Tier;
use crate::violation::Violation;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Lifecycle state of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
    Skipped,
}

/// Sort key giving every work item a unique position in the queue
///
/// Orders by tier, then `primary` and `secondary` descending, then each
/// tie-break value descending, then path ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityKey {
    pub tier: Tier,
    pub primary: f64,
    pub secondary: f64,
    /// Values of the configured tie breakers, in configured order
    pub tie_breaks: Vec<f64>,
    pub path: PathBuf,
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tier
            .cmp(&other.tier)
            .then_with(|| other.primary.total_cmp(&self.primary))
            .then_with(|| other.secondary.total_cmp(&self.secondary))
            .then_with(|| {
                for (mine, theirs) in self.tie_breaks.iter().zip(&other.tie_breaks) {
                    match theirs.total_cmp(mine) {
                        Ordering::Equal => continue,
                        decided => return decided,
                    }
                }
                Ordering::Equal
            })
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PriorityKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityKey {}

/// All the work planned for one file in one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub file: PathBuf,
    /// Resolved in order by the transformation step
    pub violations: Vec<Violation>,
    pub key: PriorityKey,
    pub state: WorkItemState,
}

impl WorkItem {
    /// A pending item whose key only orders by tier and path
    pub fn new(file: impl Into<PathBuf>, tier: Tier, violations: Vec<Violation>) -> Self {
        let file = file.into();
        Self {
            key: PriorityKey {
                tier,
                primary: 0.0,
                secondary: 0.0,
                tie_breaks: Vec::new(),
                path: file.clone(),
            },
            file,
            violations,
            state: WorkItemState::Pending,
        }
    }

    pub fn tier(&self) -> Tier {
        self.key.tier
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            WorkItemState::Succeeded | WorkItemState::Failed | WorkItemState::Skipped
        )
    }
}

/// Identifier of a dispatched batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// An immutable set of work items dispatched together
#[derive(Debug, Clone)]
pub struct Batch {
    id: BatchId,
    items: Vec<WorkItem>,
}

impl Batch {
    /// Dispatch the items, marking all of them InFlight together
    pub fn dispatch(id: BatchId, items: Vec<WorkItem>) -> Self {
        let items = items
            .into_iter()
            .map(|mut item| {
                item.state = WorkItemState::InFlight;
                item
            })
            .collect();
        Self { id, items }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.items.iter().map(|item| &item.file)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
