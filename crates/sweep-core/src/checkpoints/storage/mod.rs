//! Checkpoint storage backends

use crate::error::SweepResult;
use async_trait::async_trait;

use super::types::Checkpoint;

mod file_storage;
mod memory_storage;


pub use file_storage::FileCheckpointStore;
pub use memory_storage::MemoryCheckpointStore;

/// Append-only store of checkpoints keyed by sequence number
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The most recent fully written checkpoint
    async fn latest(&self) -> SweepResult<Option<Checkpoint>>;

    /// Sequence number of the most recent checkpoint
    async fn latest_sequence(&self) -> SweepResult<Option<u64>>;

    /// Durably append a checkpoint.
    ///
    /// The sequence must be exactly one past the latest, or zero for an
    /// empty store.
    async fn append(&self, checkpoint: &Checkpoint) -> SweepResult<()>;

    /// Load a specific checkpoint
    async fn load(&self, sequence: u64) -> SweepResult<Option<Checkpoint>>;
}

/// Sequence number the next append must carry
pub(crate) fn next_sequence(latest: Option<u64>) -> u64 {
    latest.map_or(0, |seq| seq + 1)
}
