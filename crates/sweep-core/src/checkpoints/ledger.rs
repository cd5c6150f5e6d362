//! Per-file outcome bookkeeping carried from checkpoint to checkpoint

use crate::planner::{PlanExclusions, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// What the run has done with one file so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Failed or rejected attempts
    pub attempts: u32,
    /// Tiers in which a fix for this file was committed
    #[serde(default)]
    pub succeeded: BTreeSet<Tier>,
    /// Excluded until the next Analyzing phase
    #[serde(default)]
    pub skipped: bool,
    /// Excluded for the rest of the run
    #[serde(default)]
    pub given_up: bool,
    pub last_reason: Option<String>,
}

/// Outcomes of every file the run has touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLedger {
    #[serde(default)]
    files: BTreeMap<PathBuf, FileRecord>,
}

impl RunLedger {
    pub fn get(&self, file: &Path) -> Option<&FileRecord> {
        self.files.get(file)
    }

    pub fn record_success(&mut self, file: &Path, tier: Tier) {
        let record = self.files.entry(file.to_path_buf()).or_default();
        record.succeeded.insert(tier);
        record.skipped = false;
        record.last_reason = None;
    }

    /// Count a failed attempt and skip the file for this cycle.
    ///
    /// Returns `true` when the attempt budget is now exhausted.
    pub fn record_failure(
        &mut self,
        file: &Path,
        reason: impl Into<String>,
        max_attempts: u32,
    ) -> bool {
        let record = self.files.entry(file.to_path_buf()).or_default();
        record.attempts += 1;
        record.skipped = true;
        record.last_reason = Some(reason.into());
        if record.attempts >= max_attempts {
            record.given_up = true;
        }
        record.given_up
    }

    /// Skip the file for this cycle without counting an attempt
    pub fn record_skip(&mut self, file: &Path, reason: impl Into<String>) {
        let record = self.files.entry(file.to_path_buf()).or_default();
        record.skipped = true;
        record.last_reason = Some(reason.into());
    }

    /// Skips only last until the next Analyzing phase
    pub fn begin_cycle(&mut self) {
        for record in self.files.values_mut() {
            record.skipped = false;
        }
    }

    pub fn exclusions(&self) -> PlanExclusions {
        let mut exclusions = PlanExclusions::default();
        for (file, record) in &self.files {
            if record.skipped {
                exclusions.skipped.insert(file.clone());
            }
            if record.given_up {
                exclusions.given_up.insert(file.clone());
            }
            for tier in &record.succeeded {
                exclusions.succeeded.insert((file.clone(), *tier));
            }
        }
        exclusions
    }

    /// Files with at least one committed fix
    pub fn completed(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|(_, r)| !r.succeeded.is_empty())
            .map(|(f, _)| f.as_path())
    }

    /// Skipped this cycle but not given up, with the last reason
    pub fn skipped(&self) -> impl Iterator<Item = (&Path, Option<&str>)> {
        self.files
            .iter()
            .filter(|(_, r)| r.skipped && !r.given_up)
            .map(|(f, r)| (f.as_path(), r.last_reason.as_deref()))
    }

    pub fn given_up(&self) -> impl Iterator<Item = (&Path, Option<&str>)> {
        self.files
            .iter()
            .filter(|(_, r)| r.given_up)
            .map(|(f, r)| (f.as_path(), r.last_reason.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_gives_up_after_budget() {
        let mut ledger = RunLedger::default();
        let file = Path::new("src/a.rs");

        assert!(!ledger.record_failure(file, "tests failed", 2));
        ledger.begin_cycle();
        assert!(ledger.exclusions().skipped.is_empty());

        assert!(ledger.record_failure(file, "tests failed again", 2));
        ledger.begin_cycle();
        let exclusions = ledger.exclusions();
        assert!(exclusions.given_up.contains(file));
        assert_eq!(ledger.given_up().count(), 1);
        assert_eq!(ledger.skipped().count(), 0);
    }

    #[test]
    fn test_skip_does_not_count_attempt() {
        let mut ledger = RunLedger::default();
        let file = Path::new("b.rs");
        ledger.record_skip(file, "skipped by operator");
        assert_eq!(ledger.get(file).unwrap().attempts, 0);
        assert!(ledger.exclusions().skipped.contains(file));
        assert_eq!(
            ledger.skipped().next(),
            Some((file, Some("skipped by operator")))
        );
    }

    #[test]
    fn test_success_is_per_tier() {
        let mut ledger = RunLedger::default();
        let file = Path::new("c.rs");
        ledger.record_success(file, Tier::Lint);

        let exclusions = ledger.exclusions();
        assert!(exclusions.excludes(file, Tier::Lint));
        assert!(!exclusions.excludes(file, Tier::LowCoverage));
        assert_eq!(ledger.completed().collect::<Vec<_>>(), vec![file]);
    }
}
