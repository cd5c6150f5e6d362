//! Status reporting and the operator handle

use crate::interrupt::{InterruptManager, InterruptReason};
use crate::metrics::RefactorProgress;
use crate::orchestrator::state::{OrchestratorState, RunOutcome};
use crate::planner::Tier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::watch;

/// A skipped or given-up file and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNote {
    pub file: PathBuf,
    pub reason: Option<String>,
}

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: OrchestratorState,
    pub cycle: u64,
    /// Latest durable checkpoint
    pub sequence: Option<u64>,
    pub active_tier: Option<Tier>,
    /// Schedulable files per tier
    pub queue_depth: BTreeMap<Tier, usize>,
    pub completed: usize,
    pub skipped: Vec<FileNote>,
    pub given_up: Vec<FileNote>,
    /// Violation sources that could not be queried in the last cycle
    pub degraded: Vec<String>,
    pub progress: Option<RefactorProgress>,
    pub outcome: Option<RunOutcome>,
}

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            state: OrchestratorState::Analyzing,
            cycle: 0,
            sequence: None,
            active_tier: None,
            queue_depth: BTreeMap::new(),
            completed: 0,
            skipped: Vec::new(),
            given_up: Vec::new(),
            degraded: Vec::new(),
            progress: None,
            outcome: None,
        }
    }
}

impl StatusReport {
    pub fn queued(&self) -> usize {
        self.queue_depth.values().sum()
    }
}

/// Cloneable control surface over a running orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    interrupt: InterruptManager,
    status: watch::Receiver<StatusReport>,
}

impl OrchestratorHandle {
    pub(crate) fn new(interrupt: InterruptManager, status: watch::Receiver<StatusReport>) -> Self {
        Self { interrupt, status }
    }

    /// Stop at the next batch boundary
    pub fn interrupt(&self) {
        self.interrupt.interrupt(InterruptReason::Manual);
    }

    pub fn status(&self) -> StatusReport {
        self.status.borrow().clone()
    }

    /// Wait for the next status change
    pub async fn changed(&mut self) -> Option<StatusReport> {
        self.status.changed().await.ok()?;
        Some(self.status.borrow_and_update().clone())
    }
}
