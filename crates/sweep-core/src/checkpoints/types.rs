//! Checkpoint record types

use crate::checkpoints::ledger::RunLedger;
use crate::metrics::QualityMetrics;
use crate::planner::{Tier, WorkItem};
use crate::violation::Revision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full resumable snapshot of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Monotonic, one greater than the previous checkpoint
    pub sequence: u64,
    pub run_id: RunId,
    /// Analyzing cycles completed when the checkpoint was taken
    pub cycle: u64,
    /// Remaining planned work at commit time
    pub queue: Vec<WorkItem>,
    /// Candidate file count per tier at commit time
    pub queue_depth: BTreeMap<Tier, usize>,
    /// Per-file outcomes and attempt counters
    pub ledger: RunLedger,
    /// Metrics from the first collection of the run
    pub baseline: QualityMetrics,
    pub metrics: QualityMetrics,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// First checkpoint of a run
    pub fn initial(sequence: u64) -> Self {
        let now = Utc::now();
        Self {
            sequence,
            run_id: RunId::new(),
            cycle: 0,
            queue: Vec::new(),
            queue_depth: BTreeMap::new(),
            ledger: RunLedger::default(),
            baseline: QualityMetrics::default(),
            metrics: QualityMetrics::default(),
            started_at: now,
            created_at: now,
        }
    }

    /// The checkpoint that follows this one, same run
    pub fn successor(&self) -> Self {
        Self {
            sequence: self.sequence + 1,
            created_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Working tree revision this checkpoint describes
    pub fn revision(&self) -> Revision {
        Revision(self.sequence)
    }
}
