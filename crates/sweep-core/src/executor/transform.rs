//! The pluggable transformation capability

use crate::error::SweepResult;
use crate::violation::{Project, Violation};
use async_trait::async_trait;

/// Result of one transformation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Resolved,
    Unresolved { reason: String },
}

impl TransformOutcome {
    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self::Unresolved {
            reason: reason.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

/// Fixes one violation by editing the working tree in place
///
/// How a fix is produced is opaque to the orchestrator. Implementations
/// only touch `violation.file`.
#[async_trait]
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;

    async fn transform(
        &self,
        project: &Project,
        violation: &Violation,
    ) -> SweepResult<TransformOutcome>;
}
