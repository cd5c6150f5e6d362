//! Durable, versioned orchestrator state
//!
//! Every committed batch appends a [`Checkpoint`] holding the full
//! resumable snapshot. The newest checkpoint alone determines where a
//! resumed run picks up.

pub mod ledger;
pub mod storage;
pub mod types;

pub use ledger::{FileRecord, RunLedger};
pub use storage::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use types::{Checkpoint, RunId};
