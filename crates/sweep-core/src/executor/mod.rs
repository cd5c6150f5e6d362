//! Batch execution over a bounded worker pool
//!
//! Every work item holds its file's lock from dispatch until the batch
//! resolves, and carries the pre-image needed to restore the file exactly.

pub mod executor;
pub mod locks;
pub mod preimage;
pub mod report;
pub mod transform;

pub use executor::BatchExecutor;
pub use locks::{FileGuard, FileLockTable};
pub use preimage::PreImage;
pub use report::{BatchReport, ItemOutcome, ItemReport};
pub use transform::{TransformOutcome, Transformer};
