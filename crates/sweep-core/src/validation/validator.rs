//! Batch validation against the project-wide gates

use crate::config::GatesConfig;
use crate::validation::oracle::{GateReport, QualityOracle};
use crate::validation::report::{FileVerdict, Gate, GateResult, GateStatus, ValidationReport};
use crate::violation::Project;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Runs the build, test and coverage gates, stopping at the first failure
pub struct Validator {
    oracle: Arc<dyn QualityOracle>,
    gates: GatesConfig,
}

impl Validator {
    pub fn new(oracle: Arc<dyn QualityOracle>, gates: GatesConfig) -> Self {
        Self { oracle, gates }
    }

    fn enabled(&self, gate: Gate) -> bool {
        match gate {
            Gate::Build => self.gates.build,
            Gate::Test => self.gates.test,
            Gate::Coverage => self.gates.coverage,
        }
    }

    /// Aggregate coverage of the untouched tree, used as the pre-batch value
    /// until a commit records one. `None` when the gate is off or the
    /// oracle cannot answer.
    pub async fn measure_baseline(&self, project: &Project) -> Option<f64> {
        if !self.gates.coverage {
            return None;
        }
        match self.oracle.coverage(project).await {
            Ok(percent) => {
                tracing::info!(coverage = percent, "Measured baseline coverage");
                Some(percent)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not measure baseline coverage");
                None
            }
        }
    }

    /// Validate the working tree after a batch touched `files`.
    ///
    /// `baseline` is the aggregate coverage before the batch. A failure of
    /// any gate fails the whole batch, whatever the files reported locally.
    pub async fn validate(
        &self,
        project: &Project,
        files: &[PathBuf],
        baseline: Option<f64>,
    ) -> ValidationReport {
        let mut gates = Vec::with_capacity(Gate::ORDERED.len());
        let mut blamed: BTreeSet<PathBuf> = BTreeSet::new();
        let mut coverage = None;
        let mut failed = false;

        for gate in Gate::ORDERED {
            let status = if failed {
                GateStatus::NotRun
            } else if !self.enabled(gate) {
                GateStatus::Disabled
            } else {
                match gate {
                    Gate::Build => {
                        let result = self.oracle.build(project).await;
                        self.binary_gate(gate, result, &mut blamed)
                    }
                    Gate::Test => {
                        let result = self.oracle.test(project).await;
                        self.binary_gate(gate, result, &mut blamed)
                    }
                    Gate::Coverage => {
                        let (status, measured) = self.coverage_gate(project, baseline).await;
                        coverage = measured;
                        status
                    }
                }
            };

            if status.is_failure() {
                tracing::warn!(gate = %gate, "Validation gate failed");
                failed = true;
            }
            gates.push(GateResult { gate, status });
        }

        let files = files
            .iter()
            .map(|file| {
                let verdict = if !failed {
                    FileVerdict::Passed
                } else if blamed.contains(file) {
                    FileVerdict::Failed
                } else {
                    FileVerdict::Implicated
                };
                (file.clone(), verdict)
            })
            .collect::<BTreeMap<_, _>>();

        ValidationReport {
            gates,
            files,
            coverage,
        }
    }

    fn binary_gate(
        &self,
        gate: Gate,
        result: crate::error::SweepResult<GateReport>,
        blamed: &mut BTreeSet<PathBuf>,
    ) -> GateStatus {
        match result {
            Ok(report) if report.passed => GateStatus::Passed,
            Ok(report) => {
                blamed.extend(report.failing_files);
                GateStatus::Failed {
                    diagnostics: report
                        .diagnostics
                        .unwrap_or_else(|| format!("{} failed", gate)),
                }
            }
            Err(e) => GateStatus::Failed {
                diagnostics: format!("could not run {}: {}", gate, e),
            },
        }
    }

    async fn coverage_gate(
        &self,
        project: &Project,
        baseline: Option<f64>,
    ) -> (GateStatus, Option<f64>) {
        let measured = self.oracle.coverage(project).await;
        match (baseline, measured) {
            (Some(before), Ok(after)) => {
                if after + self.gates.coverage_tolerance < before {
                    (
                        GateStatus::Failed {
                            diagnostics: format!(
                                "coverage regressed from {:.2}% to {:.2}%",
                                before, after
                            ),
                        },
                        Some(after),
                    )
                } else {
                    (GateStatus::Passed, Some(after))
                }
            }
            // The pre-batch tree could not be measured
            (None, Ok(after)) => (GateStatus::Passed, Some(after)),
            (Some(before), Err(e)) => (
                GateStatus::Failed {
                    diagnostics: format!(
                        "coverage could not be measured against baseline {:.2}%: {}",
                        before, e
                    ),
                },
                None,
            ),
            (None, Err(e)) => {
                tracing::warn!(error = %e, "Coverage unavailable, gate degraded");
                (
                    GateStatus::Degraded {
                        reason: e.to_string(),
                    },
                    None,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use crate::validation::oracle::MockQualityOracle;

    fn files() -> Vec<PathBuf> {
        vec![PathBuf::from("a.rs"), PathBuf::from("b.rs")]
    }

    #[tokio::test]
    async fn test_all_gates_pass() {
        let mut oracle = MockQualityOracle::new();
        oracle.expect_build().times(1).returning(|_| Ok(GateReport::pass()));
        oracle.expect_test().times(1).returning(|_| Ok(GateReport::pass()));
        oracle.expect_coverage().times(1).returning(|_| Ok(81.0));

        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        let report = validator
            .validate(&Project::new("/tmp/p"), &files(), Some(80.0))
            .await;

        assert!(report.passed());
        assert_eq!(report.coverage, Some(81.0));
        assert!(report.files.values().all(|v| *v == FileVerdict::Passed));
    }

    #[tokio::test]
    async fn test_build_failure_short_circuits() {
        let mut oracle = MockQualityOracle::new();
        oracle.expect_build().times(1).returning(|_| {
            Ok(GateReport::fail("error[E0308]").with_failing_files(vec![PathBuf::from("b.rs")]))
        });
        oracle.expect_test().times(0);
        oracle.expect_coverage().times(0);

        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        let report = validator
            .validate(&Project::new("/tmp/p"), &files(), Some(80.0))
            .await;

        assert!(!report.passed());
        assert_eq!(report.failed_gate().unwrap().gate, Gate::Build);
        assert_eq!(report.status_of(Gate::Test), Some(&GateStatus::NotRun));
        assert_eq!(report.files[&PathBuf::from("b.rs")], FileVerdict::Failed);
        assert_eq!(report.files[&PathBuf::from("a.rs")], FileVerdict::Implicated);
        assert!(report.summary().contains("error[E0308]"));
    }

    #[tokio::test]
    async fn test_test_failure_overrides_local_success() {
        let mut oracle = MockQualityOracle::new();
        oracle.expect_build().returning(|_| Ok(GateReport::pass()));
        oracle
            .expect_test()
            .returning(|_| Ok(GateReport::fail("2 tests failed")));
        oracle.expect_coverage().times(0);

        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        let report = validator.validate(&Project::new("/tmp/p"), &files(), None).await;
        assert!(!report.passed());
        assert_eq!(report.failed_gate().unwrap().gate, Gate::Test);
    }

    #[tokio::test]
    async fn test_coverage_regression_respects_tolerance() {
        let mut oracle = MockQualityOracle::new();
        oracle.expect_build().returning(|_| Ok(GateReport::pass()));
        oracle.expect_test().returning(|_| Ok(GateReport::pass()));
        oracle.expect_coverage().returning(|_| Ok(79.5));

        let strict = Arc::new(oracle);
        let validator = Validator::new(strict.clone(), GatesConfig::default());
        let report = validator
            .validate(&Project::new("/tmp/p"), &files(), Some(80.0))
            .await;
        assert_eq!(report.failed_gate().unwrap().gate, Gate::Coverage);

        let lenient = Validator::new(
            strict,
            GatesConfig {
                coverage_tolerance: 1.0,
                ..GatesConfig::default()
            },
        );
        let report = lenient
            .validate(&Project::new("/tmp/p"), &files(), Some(80.0))
            .await;
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_coverage_without_baseline() {
        let mut oracle = MockQualityOracle::new();
        oracle.expect_build().returning(|_| Ok(GateReport::pass()));
        oracle.expect_test().returning(|_| Ok(GateReport::pass()));
        oracle
            .expect_coverage()
            .returning(|_| Err(SweepError::validation("coverage", "tool missing")));

        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        let report = validator.validate(&Project::new("/tmp/p"), &files(), None).await;
        assert!(report.passed());
        assert!(matches!(
            report.status_of(Gate::Coverage),
            Some(GateStatus::Degraded { .. })
        ));

        let mut oracle = MockQualityOracle::new();
        oracle.expect_build().returning(|_| Ok(GateReport::pass()));
        oracle.expect_test().returning(|_| Ok(GateReport::pass()));
        oracle
            .expect_coverage()
            .returning(|_| Err(SweepError::validation("coverage", "tool missing")));
        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        let report = validator
            .validate(&Project::new("/tmp/p"), &files(), Some(70.0))
            .await;
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_baseline_measurement() {
        let mut oracle = MockQualityOracle::new();
        oracle.expect_coverage().times(1).returning(|_| Ok(64.0));
        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        assert_eq!(
            validator.measure_baseline(&Project::new("/tmp/p")).await,
            Some(64.0)
        );

        let mut oracle = MockQualityOracle::new();
        oracle
            .expect_coverage()
            .returning(|_| Err(SweepError::validation("coverage", "tool missing")));
        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        assert_eq!(validator.measure_baseline(&Project::new("/tmp/p")).await, None);

        let mut oracle = MockQualityOracle::new();
        oracle.expect_coverage().times(0);
        let gates = GatesConfig {
            coverage: false,
            ..GatesConfig::default()
        };
        let validator = Validator::new(Arc::new(oracle), gates);
        assert_eq!(validator.measure_baseline(&Project::new("/tmp/p")).await, None);
    }

    #[tokio::test]
    async fn test_disabled_gates_are_not_called() {
        let mut oracle = MockQualityOracle::new();
        oracle.expect_build().times(1).returning(|_| Ok(GateReport::pass()));
        oracle.expect_test().times(0);
        oracle.expect_coverage().times(0);

        let gates = GatesConfig {
            test: false,
            coverage: false,
            ..GatesConfig::default()
        };
        let validator = Validator::new(Arc::new(oracle), gates);
        let report = validator.validate(&Project::new("/tmp/p"), &files(), None).await;
        assert!(report.passed());
        assert_eq!(report.status_of(Gate::Test), Some(&GateStatus::Disabled));
    }

    #[tokio::test]
    async fn test_oracle_error_fails_gate() {
        let mut oracle = MockQualityOracle::new();
        oracle
            .expect_build()
            .returning(|_| Err(SweepError::validation("build", "cargo not found")));
        oracle.expect_test().times(0);
        oracle.expect_coverage().times(0);

        let validator = Validator::new(Arc::new(oracle), GatesConfig::default());
        let report = validator.validate(&Project::new("/tmp/p"), &files(), None).await;
        assert!(!report.passed());
        assert!(report.summary().contains("cargo not found"));
    }
}
