//! Exact pre-dispatch snapshots of working tree files

use crate::error::{SweepError, SweepResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// File content captured before a transformation touched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreImage {
    path: PathBuf,
    /// `None` when the file did not exist
    content: Option<Vec<u8>>,
    digest: String,
}

fn digest_of(content: Option<&[u8]>) -> String {
    let mut hasher = Sha256::new();
    match content {
        Some(bytes) => {
            hasher.update([1u8]);
            hasher.update(bytes);
        }
        None => hasher.update([0u8]),
    }
    format!("{:x}", hasher.finalize())
}

async fn read_optional(path: &Path) -> SweepResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SweepError::io_at(
            format!("Failed to read working tree file: {}", e),
            path,
        )),
    }
}

impl PreImage {
    pub async fn capture(path: impl Into<PathBuf>) -> SweepResult<Self> {
        let path = path.into();
        let content = read_optional(&path).await?;
        let digest = digest_of(content.as_deref());
        Ok(Self {
            path,
            content,
            digest,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Content at capture time, `None` if the file did not exist
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn existed(&self) -> bool {
        self.content.is_some()
    }

    /// Whether the file on disk still matches the snapshot
    pub async fn is_unchanged(&self) -> SweepResult<bool> {
        let current = read_optional(&self.path).await?;
        Ok(digest_of(current.as_deref()) == self.digest)
    }

    /// Put the file back byte for byte and verify it
    pub async fn restore(&self) -> SweepResult<()> {
        if self.is_unchanged().await? {
            return Ok(());
        }

        match &self.content {
            Some(bytes) => fs::write(&self.path, bytes).await.map_err(|e| {
                SweepError::io_at(format!("Failed to restore file: {}", e), &self.path)
            })?,
            None => match fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(SweepError::io_at(
                        format!("Failed to remove created file: {}", e),
                        &self.path,
                    ));
                }
            },
        }

        if !self.is_unchanged().await? {
            return Err(SweepError::io_at(
                "Restored content does not match the pre-image",
                &self.path,
            ));
        }
        tracing::debug!(file = %self.path.display(), "Restored pre-image");
        Ok(())
    }
}
