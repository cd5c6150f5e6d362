//! Configuration data model

use crate::error::{SweepError, SweepResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level orchestrator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub orchestrator: OrchestratorSettings,
    pub quality: QualityProfile,
    pub planner: PlannerConfig,
    pub filter: FilterConfig,
    pub gates: GatesConfig,
    pub commands: CommandsConfig,
}

/// Worker pool, batching and budget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Size of the transformation worker pool
    pub workers: usize,
    /// Maximum number of work items dispatched together
    pub batch_size: usize,
    /// Stop after this many Analyzing cycles
    pub max_cycles: Option<u32>,
    /// Stop once the run has been going for this long
    #[serde(with = "humantime_serde")]
    pub max_runtime: Option<Duration>,
    /// Give up on a file after this many failed attempts
    pub max_attempts_per_file: u32,
    /// Where checkpoints are written, relative to the project root
    pub checkpoint_dir: PathBuf,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_size: 8,
            max_cycles: None,
            max_runtime: None,
            max_attempts_per_file: 3,
            checkpoint_dir: PathBuf::from(".sweep/checkpoints"),
        }
    }
}

/// Quality thresholds that turn raw analyzer readings into violations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityProfile {
    /// Minimum per-file coverage percent
    pub coverage_min: f64,
    /// Maximum cyclomatic complexity per function
    pub complexity_max: u32,
    /// Complexity the transformations should aim for
    pub complexity_target: u32,
    /// Number of SATD items tolerated per file
    pub satd_allowed: u32,
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self {
            coverage_min: 80.0,
            complexity_max: 10,
            complexity_target: 5,
            satd_allowed: 0,
        }
    }
}

/// Secondary ordering applied inside a tier before the path tie-break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    /// Technical debt gradient, highest first
    DebtGradient,
    /// Recent change frequency, highest first
    Churn,
}

impl std::fmt::Display for TieBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DebtGradient => write!(f, "debt_gradient"),
            Self::Churn => write!(f, "churn"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub tie_breakers: Vec<TieBreaker>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            tie_breakers: vec![TieBreaker::DebtGradient, TieBreaker::Churn],
        }
    }
}

/// Which files are eligible for refactoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// File with one exclude pattern per line
    pub ignore_file: Option<PathBuf>,
    /// Exclude tests, benches, fixtures and generated code
    pub default_excludes: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            ignore_file: None,
            default_excludes: true,
        }
    }
}

/// Project-wide gates run after each batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatesConfig {
    pub build: bool,
    pub test: bool,
    pub coverage: bool,
    /// Allowed coverage drop in percentage points
    pub coverage_tolerance: f64,
}

impl Default for GatesConfig {
    fn default() -> Self {
        Self {
            build: true,
            test: true,
            coverage: true,
            coverage_tolerance: 0.0,
        }
    }
}

/// Shell commands backing the external collaborators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Kill a command that runs longer than this
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub lint: Option<String>,
    pub build_errors: Option<String>,
    pub coverage: Option<String>,
    pub complexity: Option<String>,
    pub satd: Option<String>,
    pub signals: Option<String>,
    pub build: Option<String>,
    pub test: Option<String>,
    pub coverage_total: Option<String>,
    pub transform: Option<String>,
}

impl SweepConfig {
    /// Validate the configuration
    pub fn validate(&self) -> SweepResult<()> {
        let orch = &self.orchestrator;
        if orch.workers == 0 {
            return Err(SweepError::invalid_field(
                "orchestrator.workers",
                "worker pool must have at least one worker",
            ));
        }
        if orch.batch_size == 0 {
            return Err(SweepError::invalid_field(
                "orchestrator.batch_size",
                "batch size must be at least 1",
            ));
        }
        if orch.max_attempts_per_file == 0 {
            return Err(SweepError::invalid_field(
                "orchestrator.max_attempts_per_file",
                "at least one attempt per file is required",
            ));
        }

        let coverage_min = self.quality.coverage_min;
        if !(0.0..=100.0).contains(&coverage_min) {
            return Err(SweepError::invalid_field(
                "quality.coverage_min",
                format!("{} is not a percentage", coverage_min),
            ));
        }
        if self.gates.coverage_tolerance < 0.0 {
            return Err(SweepError::invalid_field(
                "gates.coverage_tolerance",
                "tolerance cannot be negative",
            ));
        }

        let mut seen = BTreeSet::new();
        for breaker in &self.planner.tie_breakers {
            if !seen.insert(breaker.to_string()) {
                return Err(SweepError::invalid_field(
                    "planner.tie_breakers",
                    format!("'{}' listed twice", breaker),
                ));
            }
        }

        for pattern in self.filter.include.iter().chain(&self.filter.exclude) {
            glob::Pattern::new(pattern)?;
        }

        Ok(())
    }
}
