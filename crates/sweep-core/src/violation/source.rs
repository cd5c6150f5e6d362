//! Collaborator seams for violation feeds

use crate::error::SweepResult;
use crate::violation::types::{Project, ViolationKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One raw reading from an external analyzer
///
/// `severity` is the analyzer's native reading for the source kind. For
/// coverage sources it is the file's coverage percent; the collector
/// converts it to an uncovered-percent severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub file: PathBuf,
    pub severity: f64,
    #[serde(default = "default_occurrences")]
    pub occurrences: u32,
    #[serde(default)]
    pub evidence: Option<String>,
}

fn default_occurrences() -> u32 {
    1
}

impl FeedEntry {
    pub fn new(file: impl Into<PathBuf>, severity: f64) -> Self {
        Self {
            file: file.into(),
            severity,
            occurrences: 1,
            evidence: None,
        }
    }

    pub fn with_occurrences(mut self, occurrences: u32) -> Self {
        self.occurrences = occurrences;
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Everything one source reported in a single query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceReport {
    pub entries: Vec<FeedEntry>,
    /// The project as a whole is in violation even without file attribution,
    /// e.g. the build fails but no error could be mapped to a file
    pub project_level: bool,
}

impl SourceReport {
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self {
            entries,
            project_level: false,
        }
    }

    pub fn project_level(mut self) -> Self {
        self.project_level = true;
        self
    }
}

/// An external analyzer producing readings of one kind
#[async_trait]
pub trait ViolationSource: Send + Sync {
    /// Name used in logs and degradation reports
    fn name(&self) -> &str;

    fn kind(&self) -> ViolationKind;

    async fn query(&self, project: &Project) -> SweepResult<SourceReport>;
}

/// Tie-break signals for a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSignals {
    /// Technical debt gradient score
    #[serde(default)]
    pub tdg: f64,
    /// Recent change frequency
    #[serde(default)]
    pub churn: f64,
}

/// Provider of per-file TDG and churn scores
#[async_trait]
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str;

    async fn signals(&self, project: &Project) -> SweepResult<BTreeMap<PathBuf, FileSignals>>;
}
