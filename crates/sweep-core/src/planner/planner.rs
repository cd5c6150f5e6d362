//! The four-tier priority planner

use crate::config::{PlannerConfig, TieBreaker};
use crate::planner::plan::{Plan, PlanExclusions};
use crate::planner::tier::Tier;
use crate::planner::work::{PriorityKey, WorkItem, WorkItemState};
use crate::violation::{Collection, FileSignals, Violation, ViolationKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Turns a [`Collection`] into a deterministic work queue
#[derive(Debug, Clone, Default)]
pub struct PriorityPlanner {
    config: PlannerConfig,
}

impl PriorityPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// The first tier with any violation, attributed to a file or not
    pub fn active_tier(&self, collection: &Collection) -> Option<Tier> {
        Tier::ORDERED
            .into_iter()
            .find(|tier| tier.kinds().iter().any(|kind| collection.has_kind(*kind)))
    }

    /// Build the ordered queue for the active tier.
    ///
    /// Excluded files are left out, but they still count toward tier
    /// emptiness: a skipped lint file keeps later tiers closed.
    pub fn plan(&self, collection: &Collection, exclusions: &PlanExclusions) -> Plan {
        let depth = self.tier_depths(collection, exclusions);
        let Some(tier) = self.active_tier(collection) else {
            return Plan {
                tier: None,
                items: Vec::new(),
                excluded: 0,
                depth,
            };
        };

        let mut excluded = 0;
        let mut items: Vec<WorkItem> = group_by_file(collection, tier)
            .into_iter()
            .filter(|(file, _)| {
                let skip = exclusions.excludes(file, tier);
                if skip {
                    excluded += 1;
                }
                !skip
            })
            .map(|(file, violations)| {
                let signals = collection.signals_for(&file);
                let key = self.key_for(tier, &file, &violations, signals);
                WorkItem {
                    file,
                    violations,
                    key,
                    state: WorkItemState::Pending,
                }
            })
            .collect();

        items.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!(
            tier = %tier,
            queued = items.len(),
            excluded,
            "Planned work queue"
        );

        Plan {
            tier: Some(tier),
            items,
            excluded,
            depth,
        }
    }

    /// Schedulable file count for every tier, ignoring precedence
    pub fn tier_depths(
        &self,
        collection: &Collection,
        exclusions: &PlanExclusions,
    ) -> BTreeMap<Tier, usize> {
        Tier::ORDERED
            .into_iter()
            .map(|tier| {
                let count = group_by_file(collection, tier)
                    .keys()
                    .filter(|file| !exclusions.excludes(file, tier))
                    .count();
                (tier, count)
            })
            .collect()
    }

    fn key_for(
        &self,
        tier: Tier,
        file: &Path,
        violations: &[Violation],
        signals: FileSignals,
    ) -> PriorityKey {
        let occurrences = |kind: ViolationKind| -> f64 {
            violations
                .iter()
                .filter(|v| v.kind == kind)
                .map(|v| f64::from(v.occurrences))
                .sum()
        };
        let max_severity = |kind: ViolationKind| -> f64 {
            violations
                .iter()
                .filter(|v| v.kind == kind)
                .map(|v| v.severity)
                .fold(0.0, f64::max)
        };

        let (primary, secondary) = match tier {
            Tier::Lint => (occurrences(ViolationKind::Lint), 0.0),
            Tier::BuildError => (occurrences(ViolationKind::BuildError), 0.0),
            // uncovered percent, so worst coverage sorts first
            Tier::LowCoverage => (max_severity(ViolationKind::LowCoverage), 0.0),
            Tier::ExtremeQuality => (
                max_severity(ViolationKind::HighComplexity),
                occurrences(ViolationKind::Satd),
            ),
        };

        let tie_breaks = self
            .config
            .tie_breakers
            .iter()
            .map(|breaker| match breaker {
                TieBreaker::DebtGradient => signals.tdg,
                TieBreaker::Churn => signals.churn,
            })
            .collect();

        PriorityKey {
            tier,
            primary,
            secondary,
            tie_breaks,
            path: file.to_path_buf(),
        }
    }
}

/// Violations of the tier's kinds grouped per file, ordered by kind then severity
fn group_by_file(collection: &Collection, tier: Tier) -> BTreeMap<PathBuf, Vec<Violation>> {
    let mut grouped: BTreeMap<PathBuf, Vec<Violation>> = BTreeMap::new();
    for violation in collection.violations.iter().filter(|v| tier.contains(v.kind)) {
        grouped
            .entry(violation.file.clone())
            .or_default()
            .push(violation.clone());
    }
    for violations in grouped.values_mut() {
        violations.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| b.severity.total_cmp(&a.severity))
        });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan::CompletionReason;
    use crate::violation::Revision;
    use std::collections::BTreeSet;

    fn lint(file: &str, count: u32) -> Violation {
        Violation::new(file, ViolationKind::Lint, 50.0).with_occurrences(count)
    }

    fn collection(violations: Vec<Violation>) -> Collection {
        let mut violations = violations;
        violations.sort_by(|a, b| a.file.cmp(&b.file).then(a.kind.cmp(&b.kind)));
        Collection {
            revision: Revision(0),
            violations,
            ..Collection::default()
        }
    }

    fn files(plan: &Plan) -> Vec<String> {
        plan.items
            .iter()
            .map(|item| item.file.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_lint_tier_blocks_later_tiers() {
        let collection = collection(vec![
            lint("a.rs", 2),
            Violation::new("b.rs", ViolationKind::BuildError, 1.0),
            Violation::new("c.rs", ViolationKind::LowCoverage, 60.0),
        ]);

        let plan = PriorityPlanner::default().plan(&collection, &PlanExclusions::default());
        assert_eq!(plan.tier, Some(Tier::Lint));
        assert_eq!(files(&plan), vec!["a.rs"]);
        assert_eq!(plan.depth[&Tier::BuildError], 1);
        assert_eq!(plan.depth[&Tier::LowCoverage], 1);
    }

    #[test]
    fn test_lint_ordered_by_count() {
        let collection = collection(vec![lint("few.rs", 1), lint("many.rs", 7), lint("some.rs", 3)]);
        let plan = PriorityPlanner::default().plan(&collection, &PlanExclusions::default());
        assert_eq!(files(&plan), vec!["many.rs", "some.rs", "few.rs"]);
    }

    #[test]
    fn test_build_tier_ordered_by_error_count() {
        let collection = collection(vec![
            Violation::new("one.rs", ViolationKind::BuildError, 1.0).with_occurrences(1),
            Violation::new("four.rs", ViolationKind::BuildError, 1.0).with_occurrences(4),
        ]);
        let plan = PriorityPlanner::default().plan(&collection, &PlanExclusions::default());
        assert_eq!(plan.tier, Some(Tier::BuildError));
        assert_eq!(files(&plan), vec!["four.rs", "one.rs"]);
    }

    #[test]
    fn test_unattributed_build_failure_blocks_coverage() {
        let mut collection = collection(vec![Violation::new("c.rs", ViolationKind::LowCoverage, 50.0)]);
        collection.project_level.insert(ViolationKind::BuildError);

        let plan = PriorityPlanner::default().plan(&collection, &PlanExclusions::default());
        assert_eq!(plan.tier, Some(Tier::BuildError));
        assert!(plan.is_empty());
        assert_eq!(
            plan.completion(),
            Some(CompletionReason::Blocked {
                tier: Tier::BuildError
            })
        );
    }

    #[test]
    fn test_coverage_worst_first() {
        // severities are uncovered percent
        let collection = collection(vec![
            Violation::new("half.rs", ViolationKind::LowCoverage, 50.0),
            Violation::new("bare.rs", ViolationKind::LowCoverage, 90.0),
            Violation::new("most.rs", ViolationKind::LowCoverage, 25.0),
        ]);
        let plan = PriorityPlanner::default().plan(&collection, &PlanExclusions::default());
        assert_eq!(plan.tier, Some(Tier::LowCoverage));
        assert_eq!(files(&plan), vec!["bare.rs", "half.rs", "most.rs"]);
    }

    #[test]
    fn test_extreme_tier_complexity_then_satd() {
        let collection = collection(vec![
            Violation::new("a.rs", ViolationKind::HighComplexity, 20.0),
            Violation::new("b.rs", ViolationKind::HighComplexity, 20.0),
            Violation::new("b.rs", ViolationKind::Satd, 1.0).with_occurrences(3),
            Violation::new("c.rs", ViolationKind::HighComplexity, 31.0),
            Violation::new("d.rs", ViolationKind::Satd, 1.0).with_occurrences(9),
        ]);
        let plan = PriorityPlanner::default().plan(&collection, &PlanExclusions::default());
        assert_eq!(plan.tier, Some(Tier::ExtremeQuality));
        assert_eq!(files(&plan), vec!["c.rs", "b.rs", "a.rs", "d.rs"]);

        let b = &plan.items[1];
        assert_eq!(b.violations.len(), 2);
        assert_eq!(b.violations[0].kind, ViolationKind::HighComplexity);
        assert_eq!(b.violations[1].kind, ViolationKind::Satd);
    }

    #[test]
    fn test_tie_breaks_follow_configuration() {
        let mut collection = collection(vec![lint("a.rs", 2), lint("b.rs", 2), lint("c.rs", 2)]);
        collection.signals.insert("a.rs".into(), FileSignals { tdg: 1.0, churn: 9.0 });
        collection.signals.insert("b.rs".into(), FileSignals { tdg: 3.0, churn: 1.0 });
        collection.signals.insert("c.rs".into(), FileSignals { tdg: 1.0, churn: 9.0 });

        let planner = PriorityPlanner::default();
        let plan = planner.plan(&collection, &PlanExclusions::default());
        assert_eq!(files(&plan), vec!["b.rs", "a.rs", "c.rs"]);

        let churn_first = PriorityPlanner::new(PlannerConfig {
            tie_breakers: vec![TieBreaker::Churn, TieBreaker::DebtGradient],
        });
        let plan = churn_first.plan(&collection, &PlanExclusions::default());
        assert_eq!(files(&plan), vec!["a.rs", "c.rs", "b.rs"]);
    }

    #[test]
    fn test_skipped_files_excluded_but_keep_tier_open() {
        let collection = collection(vec![
            lint("a.rs", 2),
            Violation::new("b.rs", ViolationKind::BuildError, 1.0),
        ]);
        let exclusions = PlanExclusions {
            skipped: BTreeSet::from([PathBuf::from("a.rs")]),
            ..PlanExclusions::default()
        };

        let plan = PriorityPlanner::default().plan(&collection, &exclusions);
        assert_eq!(plan.tier, Some(Tier::Lint));
        assert!(plan.is_empty());
        assert_eq!(plan.excluded, 1);
        assert_eq!(
            plan.completion(),
            Some(CompletionReason::Exhausted { tier: Tier::Lint })
        );
    }

    #[test]
    fn test_succeeded_exclusion_is_per_tier() {
        let collection = collection(vec![Violation::new("a.rs", ViolationKind::LowCoverage, 50.0)]);
        let exclusions = PlanExclusions {
            succeeded: BTreeSet::from([(PathBuf::from("a.rs"), Tier::Lint)]),
            ..PlanExclusions::default()
        };
        let plan = PriorityPlanner::default().plan(&collection, &exclusions);
        assert_eq!(files(&plan), vec!["a.rs"]);
    }

    #[test]
    fn test_clean_project() {
        let plan = PriorityPlanner::default().plan(&Collection::default(), &PlanExclusions::default());
        assert!(plan.tier.is_none());
        assert_eq!(plan.completion(), Some(CompletionReason::Clean));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let collection = collection(vec![lint("x.rs", 1), lint("y.rs", 1), lint("z.rs", 1)]);
        let planner = PriorityPlanner::default();
        let first = planner.plan(&collection, &PlanExclusions::default());
        let second = planner.plan(&collection, &PlanExclusions::default());
        assert_eq!(first, second);
        assert_eq!(files(&first), vec!["x.rs", "y.rs", "z.rs"]);
    }

    #[test]
    fn test_take_batch() {
        let collection = collection(vec![lint("a.rs", 3), lint("b.rs", 2), lint("c.rs", 1)]);
        let mut plan = PriorityPlanner::default().plan(&collection, &PlanExclusions::default());
        let batch = plan.take_batch(2);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].file, PathBuf::from("a.rs"));
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.take_batch(5).len(), 1);
    }
}
