//! Orchestrator states and terminal outcomes

use crate::interrupt::InterruptReason;
use crate::planner::CompletionReason;
use serde::{Deserialize, Serialize};

/// Phase the orchestrator is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Collecting violations from every source
    Analyzing,
    /// Ordering the work queue
    Planning,
    /// Transforming the next batch
    Executing,
    /// Running the project-wide gates
    Validating,
    /// Persisting a committed batch
    Checkpointing,
    /// Restoring a failed batch
    Reverting,
    /// Nothing left to schedule
    Complete,
    /// Stopped by an interrupt, a budget or a fatal error
    Aborted,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyzing => write!(f, "analyzing"),
            Self::Planning => write!(f, "planning"),
            Self::Executing => write!(f, "executing"),
            Self::Validating => write!(f, "validating"),
            Self::Checkpointing => write!(f, "checkpointing"),
            Self::Reverting => write!(f, "reverting"),
            Self::Complete => write!(f, "complete"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }

    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: &OrchestratorState) -> bool {
        use OrchestratorState::*;
        match (self, target) {
            (Analyzing, Planning) => true,
            (Planning, Executing | Complete) => true,
            (Executing, Validating) => true,
            (Validating, Checkpointing | Reverting) => true,
            (Checkpointing, Analyzing) => true,
            (Reverting, Planning) => true,
            // Interactive sessions replace Executing, Validating and Checkpointing
            (Planning, Analyzing) => true,
            (Planning, Planning) => true,
            // Fatal errors and boundary checks
            (Analyzing | Planning | Executing | Validating | Checkpointing | Reverting, Aborted) => {
                true
            }
            _ => false,
        }
    }
}

/// Why a run stopped before completing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    Interrupted,
    RuntimeBudget,
    CycleBudget,
    Fatal { message: String },
}

impl AbortReason {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }
}

impl From<InterruptReason> for AbortReason {
    fn from(_: InterruptReason) -> Self {
        Self::Interrupted
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::RuntimeBudget => write!(f, "runtime budget exceeded"),
            Self::CycleBudget => write!(f, "cycle budget exhausted"),
            Self::Fatal { message } => write!(f, "fatal: {}", message),
        }
    }
}

/// Terminal result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Complete { completion: CompletionReason },
    Aborted { abort: AbortReason },
}

impl RunOutcome {
    pub fn state(&self) -> OrchestratorState {
        match self {
            Self::Complete { .. } => OrchestratorState::Complete,
            Self::Aborted { .. } => OrchestratorState::Aborted,
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete { completion } => write!(f, "complete ({})", completion),
            Self::Aborted { abort } => write!(f, "aborted ({})", abort),
        }
    }
}
