//! Validation outcomes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Gates in the order they run, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Build,
    Test,
    Coverage,
}

impl Gate {
    pub const ORDERED: [Gate; 3] = [Self::Build, Self::Test, Self::Coverage];
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
            Self::Coverage => write!(f, "coverage"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateStatus {
    Passed,
    Failed { diagnostics: String },
    /// Passed without a measurement to compare against
    Degraded { reason: String },
    /// Turned off in configuration
    Disabled,
    /// An earlier gate failed
    NotRun,
}

impl GateStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate: Gate,
    pub status: GateStatus,
}

/// Whether a file of the batch survived validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileVerdict {
    Passed,
    /// A failing gate named this file
    Failed,
    /// Part of a failed batch without being named by the failure
    Implicated,
}

/// Outcome of validating one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub gates: Vec<GateResult>,
    pub files: BTreeMap<PathBuf, FileVerdict>,
    /// Aggregate coverage measured by this validation
    pub coverage: Option<f64>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        !self.gates.iter().any(|g| g.status.is_failure())
    }

    pub fn failed_gate(&self) -> Option<&GateResult> {
        self.gates.iter().find(|g| g.status.is_failure())
    }

    pub fn status_of(&self, gate: Gate) -> Option<&GateStatus> {
        self.gates.iter().find(|g| g.gate == gate).map(|g| &g.status)
    }

    /// One line describing why the batch failed
    pub fn summary(&self) -> String {
        match self.failed_gate() {
            Some(GateResult {
                gate,
                status: GateStatus::Failed { diagnostics },
            }) => format!("{} gate failed: {}", gate, diagnostics),
            _ => "all gates passed".to_string(),
        }
    }
}
