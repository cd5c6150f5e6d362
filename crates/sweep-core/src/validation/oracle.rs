//! The build, test and coverage oracle

use crate::error::SweepResult;
use crate::violation::Project;
use async_trait::async_trait;
use std::path::PathBuf;

/// Pass or fail of one build or test run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateReport {
    pub passed: bool,
    pub diagnostics: Option<String>,
    /// Files the failure could be attributed to, if any
    pub failing_files: Vec<PathBuf>,
}

impl GateReport {
    pub fn pass() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    pub fn fail(diagnostics: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostics: Some(diagnostics.into()),
            failing_files: Vec::new(),
        }
    }

    pub fn with_failing_files(mut self, files: Vec<PathBuf>) -> Self {
        self.failing_files = files;
        self
    }
}

/// External build, test and coverage facilities for the working tree
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QualityOracle: Send + Sync {
    async fn build(&self, project: &Project) -> SweepResult<GateReport>;

    async fn test(&self, project: &Project) -> SweepResult<GateReport>;

    /// Aggregate line coverage percent of the project
    async fn coverage(&self, project: &Project) -> SweepResult<f64>;
}
