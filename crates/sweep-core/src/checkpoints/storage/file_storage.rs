//! File-based checkpoint storage

use crate::error::{SweepError, SweepResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::super::types::Checkpoint;
use super::{CheckpointStore, next_sequence};

const LATEST_FILE: &str = "LATEST";

/// File-based checkpoint storage
///
/// ```text
/// base_path/
///   checkpoints/
///     {sequence:020}.json
///   LATEST
/// ```
///
/// Every file is written to a temporary sibling, synced, then renamed into
/// place, so a crash never leaves a half-written checkpoint behind. `LATEST`
/// holds the newest sequence number; finding the latest checkpoint never
/// scans the history unless the pointer is missing.
pub struct FileCheckpointStore {
    base_path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn checkpoints_dir(&self) -> PathBuf {
        self.base_path.join("checkpoints")
    }

    fn checkpoint_path(&self, sequence: u64) -> PathBuf {
        self.checkpoints_dir().join(format!("{:020}.json", sequence))
    }

    fn latest_path(&self) -> PathBuf {
        self.base_path.join(LATEST_FILE)
    }

    async fn ensure_dirs(&self) -> SweepResult<()> {
        fs::create_dir_all(self.checkpoints_dir())
            .await
            .map_err(|e| {
                SweepError::storage(format!("Failed to create checkpoints directory: {}", e))
            })
    }

    /// Write `bytes` to `path` through a synced temporary file and a rename
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> SweepResult<()> {
        let tmp = path.with_extension("tmp");

        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| SweepError::storage(format!("Failed to create {:?}: {}", tmp, e)))?;
        file.write_all(bytes)
            .await
            .map_err(|e| SweepError::storage(format!("Failed to write {:?}: {}", tmp, e)))?;
        file.sync_all()
            .await
            .map_err(|e| SweepError::storage(format!("Failed to sync {:?}: {}", tmp, e)))?;
        drop(file);

        fs::rename(&tmp, path).await.map_err(|e| {
            SweepError::storage(format!("Failed to move {:?} into place: {}", path, e))
        })
    }

    async fn read_pointer(&self) -> SweepResult<Option<u64>> {
        let path = self.latest_path();
        match fs::read_to_string(&path).await {
            Ok(content) => content.trim().parse::<u64>().map(Some).map_err(|e| {
                SweepError::storage_with_context(
                    format!("Corrupt latest pointer: {}", e),
                    path.display().to_string(),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SweepError::storage(format!(
                "Failed to read latest pointer: {}",
                e
            ))),
        }
    }

    /// Highest sequence present on disk, used only when the pointer is missing
    async fn scan_latest(&self) -> SweepResult<Option<u64>> {
        let dir = self.checkpoints_dir();
        if !dir.exists() {
            return Ok(None);
        }

        let mut latest = None;
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            SweepError::storage(format!("Failed to read checkpoints directory: {}", e))
        })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SweepError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let sequence = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<u64>().ok());
                if let Some(sequence) = sequence {
                    latest = latest.max(Some(sequence));
                }
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn latest(&self) -> SweepResult<Option<Checkpoint>> {
        match self.latest_sequence().await? {
            Some(sequence) => self.load(sequence).await,
            None => Ok(None),
        }
    }

    async fn latest_sequence(&self) -> SweepResult<Option<u64>> {
        match self.read_pointer().await? {
            // The checkpoint rename happens before the pointer update; a
            // crash in between leaves one newer checkpoint than the pointer.
            Some(sequence) if self.checkpoint_path(sequence + 1).exists() => Ok(Some(sequence + 1)),
            Some(sequence) => Ok(Some(sequence)),
            None => self.scan_latest().await,
        }
    }

    async fn append(&self, checkpoint: &Checkpoint) -> SweepResult<()> {
        self.ensure_dirs().await?;

        let expected = next_sequence(self.latest_sequence().await?);
        if checkpoint.sequence != expected {
            return Err(SweepError::storage(format!(
                "Checkpoint sequence {} out of order, expected {}",
                checkpoint.sequence, expected
            )));
        }

        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| SweepError::storage(format!("Failed to serialize checkpoint: {}", e)))?;

        let path = self.checkpoint_path(checkpoint.sequence);
        self.write_atomic(&path, &json).await?;
        self.write_atomic(
            &self.latest_path(),
            checkpoint.sequence.to_string().as_bytes(),
        )
        .await?;

        tracing::debug!(
            sequence = checkpoint.sequence,
            path = %path.display(),
            "Saved checkpoint"
        );
        Ok(())
    }

    async fn load(&self, sequence: u64) -> SweepResult<Option<Checkpoint>> {
        let path = self.checkpoint_path(sequence);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SweepError::storage(format!(
                    "Failed to read checkpoint {}: {}",
                    sequence, e
                )));
            }
        };

        let checkpoint: Checkpoint = serde_json::from_slice(&content).map_err(|e| {
            SweepError::storage_with_context(
                format!("Failed to deserialize checkpoint: {}", e),
                path.display().to_string(),
            )
        })?;
        Ok(Some(checkpoint))
    }
}
