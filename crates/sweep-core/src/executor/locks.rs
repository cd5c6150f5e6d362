//! Per-file lock table

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out exclusive, owned guards per file path
#[derive(Debug, Clone, Default)]
pub struct FileLockTable {
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Ownership of one file; released on drop
#[derive(Debug)]
pub struct FileGuard {
    file: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl FileGuard {
    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl FileLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, file: &Path) -> Arc<Mutex<()>> {
        self.locks.entry(file.to_path_buf()).or_default().clone()
    }

    /// Wait until the file is free and take it
    pub async fn acquire(&self, file: &Path) -> FileGuard {
        let lock = self.lock_for(file);
        FileGuard {
            file: file.to_path_buf(),
            _guard: lock.lock_owned().await,
        }
    }
}
