//! Violation type definitions

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Category of a quality defect
///
/// The meaning of [`Violation::severity`] depends on the kind:
/// - `Lint`: weighted lint score, one occurrence per lint issue
/// - `BuildError`: worst diagnostic weight, one occurrence per compiler error
/// - `LowCoverage`: uncovered percent (100 - coverage)
/// - `HighComplexity`: max cyclomatic complexity
/// - `Satd`: SATD item count; thresholds and ordering read the occurrences,
///   one per SATD comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Lint,
    BuildError,
    LowCoverage,
    HighComplexity,
    Satd,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 5] = [
        Self::Lint,
        Self::BuildError,
        Self::LowCoverage,
        Self::HighComplexity,
        Self::Satd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lint => "lint",
            Self::BuildError => "build_error",
            Self::LowCoverage => "low_coverage",
            Self::HighComplexity => "high_complexity",
            Self::Satd => "satd",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checkpoint sequence the working tree was at when a violation was seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A single normalized quality defect for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// File path relative to the project root
    pub file: PathBuf,
    pub kind: ViolationKind,
    /// Kind-specific magnitude, higher is always worse
    pub severity: f64,
    /// Number of underlying defect instances
    pub occurrences: u32,
    /// Optional analyzer output backing the violation
    pub evidence: Option<String>,
    pub revision: Revision,
}

impl Violation {
    pub fn new(file: impl Into<PathBuf>, kind: ViolationKind, severity: f64) -> Self {
        Self {
            file: file.into(),
            kind,
            severity,
            occurrences: 1,
            evidence: None,
            revision: Revision::default(),
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

    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }

    /// Coverage percent for `LowCoverage` violations
    pub fn coverage_percent(&self) -> Option<f64> {
        (self.kind == ViolationKind::LowCoverage).then(|| 100.0 - self.severity)
    }
}

/// The project being refactored
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a project-relative file
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        }
    }

    /// Project-relative form of a path reported by an analyzer
    pub fn relativize(&self, file: &Path) -> PathBuf {
        file.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| file.to_path_buf())
    }
}
