//! Side effects run after a batch was durably committed

use crate::error::SweepResult;
use crate::planner::Tier;
use async_trait::async_trait;
use std::path::PathBuf;

/// A batch whose checkpoint has been written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub sequence: u64,
    pub tier: Tier,
    pub files: Vec<PathBuf>,
}

/// Notified after every successful checkpoint, never before.
///
/// Errors are logged and otherwise ignored; a version control hook that
/// fails does not stop the run.
#[async_trait]
pub trait CommitObserver: Send + Sync {
    fn name(&self) -> &str;

    async fn on_commit(&self, event: &CommitEvent) -> SweepResult<()>;
}
