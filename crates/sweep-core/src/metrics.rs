//! Quality metrics and progress reporting

use crate::config::QualityProfile;
use crate::planner::Tier;
use crate::violation::{Collection, ViolationKind};
use serde::{Deserialize, Serialize};

/// Snapshot of the project's quality after one Analyzing phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub lint_violations: u32,
    pub build_errors: u32,
    /// Whether the build failed without file attribution
    pub build_failing: bool,
    pub files_below_coverage: usize,
    /// Aggregate coverage as last measured by the coverage gate
    pub coverage_percent: Option<f64>,
    pub max_complexity: f64,
    pub satd_count: u32,
    pub files_with_issues: usize,
}

impl QualityMetrics {
    pub fn from_collection(collection: &Collection, coverage_percent: Option<f64>) -> Self {
        let occurrences = |kind| collection.of_kind(kind).map(|v| v.occurrences).sum::<u32>();
        Self {
            lint_violations: occurrences(ViolationKind::Lint),
            build_errors: occurrences(ViolationKind::BuildError),
            build_failing: collection.project_level.contains(&ViolationKind::BuildError),
            files_below_coverage: collection.of_kind(ViolationKind::LowCoverage).count(),
            coverage_percent,
            max_complexity: collection
                .of_kind(ViolationKind::HighComplexity)
                .map(|v| v.severity)
                .fold(0.0, f64::max),
            satd_count: occurrences(ViolationKind::Satd),
            files_with_issues: collection.files_with_issues(),
        }
    }
}

/// Completion of the run relative to the metrics observed when it started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactorProgress {
    pub overall_completion_percent: f64,
    pub lint_completion_percent: f64,
    pub complexity_completion_percent: f64,
    pub satd_completion_percent: f64,
    pub coverage_completion_percent: f64,
    /// Active tier, `None` once nothing remains
    pub current_phase: Option<Tier>,
    pub gates_passed: Vec<String>,
    pub gates_remaining: Vec<String>,
}

impl RefactorProgress {
    pub fn calculate(
        baseline: &QualityMetrics,
        current: &QualityMetrics,
        current_phase: Option<Tier>,
        profile: &QualityProfile,
    ) -> Self {
        let lint = reduction(
            f64::from(baseline.lint_violations + baseline.build_errors),
            f64::from(current.lint_violations + current.build_errors),
        );
        let complexity = if current.max_complexity <= f64::from(profile.complexity_max) {
            100.0
        } else {
            reduction(baseline.max_complexity, current.max_complexity)
        };
        let satd = reduction(f64::from(baseline.satd_count), f64::from(current.satd_count));
        let coverage = match current.coverage_percent {
            _ if current.files_below_coverage == 0 => 100.0,
            Some(percent) if profile.coverage_min > 0.0 => {
                (percent / profile.coverage_min * 100.0).min(100.0)
            }
            _ => reduction(
                baseline.files_below_coverage as f64,
                current.files_below_coverage as f64,
            ),
        };

        let overall = (lint * 0.3 + complexity * 0.3 + satd * 0.2 + coverage * 0.2).min(100.0);

        let gates = [
            ("lint", current.lint_violations == 0),
            ("build", current.build_errors == 0 && !current.build_failing),
            ("coverage", current.files_below_coverage == 0),
            (
                "complexity",
                current.max_complexity <= f64::from(profile.complexity_max),
            ),
            ("satd", current.satd_count == 0),
        ];
        let (passed, remaining): (Vec<_>, Vec<_>) = gates.iter().partition(|(_, ok)| *ok);

        Self {
            overall_completion_percent: overall,
            lint_completion_percent: lint,
            complexity_completion_percent: complexity,
            satd_completion_percent: satd,
            coverage_completion_percent: coverage,
            current_phase,
            gates_passed: passed.into_iter().map(|(name, _)| name.to_string()).collect(),
            gates_remaining: remaining
                .into_iter()
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }
}

/// Percent of the starting amount that has been removed
fn reduction(baseline: f64, current: f64) -> f64 {
    if current <= 0.0 {
        100.0
    } else if baseline <= current {
        0.0
    } else {
        (baseline - current) / baseline * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::{Revision, Violation};

    #[test]
    fn test_metrics_from_collection() {
        let mut collection = Collection {
            revision: Revision(2),
            violations: vec![
                Violation::new("a.rs", ViolationKind::Lint, 4.0).with_occurrences(3),
                Violation::new("a.rs", ViolationKind::HighComplexity, 14.0),
                Violation::new("b.rs", ViolationKind::LowCoverage, 30.0),
                Violation::new("c.rs", ViolationKind::HighComplexity, 22.0),
                Violation::new("c.rs", ViolationKind::Satd, 2.0).with_occurrences(2),
            ],
            ..Collection::default()
        };
        collection.project_level.insert(ViolationKind::BuildError);

        let metrics = QualityMetrics::from_collection(&collection, Some(71.5));
        assert_eq!(metrics.lint_violations, 3);
        assert!(metrics.build_failing);
        assert_eq!(metrics.files_below_coverage, 1);
        assert_eq!(metrics.max_complexity, 22.0);
        assert_eq!(metrics.satd_count, 2);
        assert_eq!(metrics.files_with_issues, 3);
        assert_eq!(metrics.coverage_percent, Some(71.5));
    }

    #[test]
    fn test_progress_weights() {
        let baseline = QualityMetrics {
            lint_violations: 10,
            satd_count: 4,
            max_complexity: 20.0,
            files_below_coverage: 2,
            ..QualityMetrics::default()
        };
        let current = QualityMetrics {
            lint_violations: 5,
            satd_count: 4,
            max_complexity: 8.0,
            files_below_coverage: 0,
            ..QualityMetrics::default()
        };

        let progress = RefactorProgress::calculate(
            &baseline,
            &current,
            Some(Tier::Lint),
            &QualityProfile::default(),
        );
        assert_eq!(progress.lint_completion_percent, 50.0);
        assert_eq!(progress.complexity_completion_percent, 100.0);
        assert_eq!(progress.satd_completion_percent, 0.0);
        assert_eq!(progress.coverage_completion_percent, 100.0);
        // 15 + 30 + 0 + 20
        assert!((progress.overall_completion_percent - 65.0).abs() < 1e-9);
        assert_eq!(progress.gates_remaining, vec!["lint", "satd"]);
        assert!(progress.gates_passed.contains(&"coverage".to_string()));
    }

    #[test]
    fn test_clean_project_is_complete() {
        let progress = RefactorProgress::calculate(
            &QualityMetrics::default(),
            &QualityMetrics::default(),
            None,
            &QualityProfile::default(),
        );
        assert_eq!(progress.overall_completion_percent, 100.0);
        assert!(progress.gates_remaining.is_empty());
    }
}
