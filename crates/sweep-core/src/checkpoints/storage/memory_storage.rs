//! In-memory checkpoint storage

use crate::error::{SweepError, SweepResult};
use async_trait::async_trait;
use std::collections::BTreeMap;

use super::super::types::Checkpoint;
use super::{CheckpointStore, next_sequence};

/// Checkpoint storage that lives only as long as the process
#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoints: tokio::sync::RwLock<BTreeMap<u64, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose history starts at an existing checkpoint, so that
    /// resumed sequence numbering continues from it
    pub fn seeded(checkpoint: Checkpoint) -> Self {
        let mut checkpoints = BTreeMap::new();
        checkpoints.insert(checkpoint.sequence, checkpoint);
        Self {
            checkpoints: tokio::sync::RwLock::new(checkpoints),
        }
    }

    /// Number of stored checkpoints
    pub async fn len(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.checkpoints.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn latest(&self) -> SweepResult<Option<Checkpoint>> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.values().next_back().cloned())
    }

    async fn latest_sequence(&self) -> SweepResult<Option<u64>> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.keys().next_back().copied())
    }

    async fn append(&self, checkpoint: &Checkpoint) -> SweepResult<()> {
        let mut checkpoints = self.checkpoints.write().await;
        let expected = next_sequence(checkpoints.keys().next_back().copied());
        if checkpoint.sequence != expected {
            return Err(SweepError::storage(format!(
                "Checkpoint sequence {} out of order, expected {}",
                checkpoint.sequence, expected
            )));
        }
        checkpoints.insert(checkpoint.sequence, checkpoint.clone());
        Ok(())
    }

    async fn load(&self, sequence: u64) -> SweepResult<Option<Checkpoint>> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(&sequence).cloned())
    }
}
