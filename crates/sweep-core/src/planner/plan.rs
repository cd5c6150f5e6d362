//! Planning output

use crate::planner::tier::Tier;
use crate::planner::work::WorkItem;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Why a run reached `Complete`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CompletionReason {
    /// No violation of any kind remains
    Clean,
    /// The active tier only contains files that were skipped or given up
    Exhausted { tier: Tier },
    /// The active tier is non-empty only at project level, nothing can be scheduled
    Blocked { tier: Tier },
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "no violations remain"),
            Self::Exhausted { tier } => {
                write!(f, "gave up: every remaining {} file was skipped", tier)
            }
            Self::Blocked { tier } => {
                write!(f, "blocked: {} tier has no schedulable files", tier)
            }
        }
    }
}

/// Files the planner must leave out of the queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanExclusions {
    /// Skipped in the current cycle
    pub skipped: BTreeSet<PathBuf>,
    /// Exceeded the attempt budget; excluded for the whole run
    pub given_up: BTreeSet<PathBuf>,
    /// Already committed in this tier during the run
    pub succeeded: BTreeSet<(PathBuf, Tier)>,
}

impl PlanExclusions {
    pub fn excludes(&self, file: &Path, tier: Tier) -> bool {
        self.skipped.contains(file)
            || self.given_up.contains(file)
            || self.succeeded.contains(&(file.to_path_buf(), tier))
    }
}

/// Ordered queue produced by one planning pass
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// First non-empty tier, `None` when the project is clean
    pub tier: Option<Tier>,
    /// Priority ordered, one item per file
    pub items: Vec<WorkItem>,
    /// Files of the active tier left out because of exclusions
    pub excluded: usize,
    /// Candidate file count per tier, ignoring tier precedence
    pub depth: BTreeMap<Tier, usize>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Why nothing could be scheduled, when the queue is empty
    pub fn completion(&self) -> Option<CompletionReason> {
        if !self.items.is_empty() {
            return None;
        }
        Some(match self.tier {
            None => CompletionReason::Clean,
            Some(tier) if self.excluded > 0 => CompletionReason::Exhausted { tier },
            Some(tier) => CompletionReason::Blocked { tier },
        })
    }

    /// Take the next slice of at most `size` items from the head of the queue
    pub fn take_batch(&mut self, size: usize) -> Vec<WorkItem> {
        let size = size.min(self.items.len());
        self.items.drain(..size).collect()
    }
}
