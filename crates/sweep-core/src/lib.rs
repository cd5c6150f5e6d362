//! Sweep Core Library
//!
//! A resumable orchestrator that drives automated refactoring of a code
//! base toward a quality profile: collect violations from external
//! analyzers, plan them into strictly ordered tiers, apply fixes in
//! bounded-parallel batches, validate the project after every batch and
//! checkpoint only what passed.

pub mod checkpoints;
pub mod config;
pub mod error;
pub mod executor;
pub mod external;
pub mod filter;
pub mod interrupt;
pub mod metrics;
pub mod orchestrator;
pub mod planner;
pub mod validation;
pub mod violation;

// Re-export commonly used types
pub use checkpoints::{
    Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, RunId,
};
pub use config::{ConfigLoader, SweepConfig};
pub use error::{SweepError, SweepResult};
pub use executor::{BatchExecutor, TransformOutcome, Transformer};
pub use external::{CommandOracle, CommandTransformer, CommandViolationSource};
pub use filter::PathFilter;
pub use interrupt::{InterruptManager, InterruptReason};
pub use metrics::{QualityMetrics, RefactorProgress};
pub use orchestrator::{
    AbortReason, CommitEvent, CommitObserver, DryRun, Engine, EngineBuilder, InteractiveDriver,
    Orchestrator, OrchestratorHandle, OrchestratorState, RunOutcome, RunSummary, Session,
    SessionOutcome, StartMode, StatusReport,
};
pub use planner::{CompletionReason, PriorityPlanner, Tier, WorkItem};
pub use validation::{GateReport, QualityOracle, ValidationReport, Validator};
pub use violation::{
    FeedEntry, Project, SignalSource, SourceReport, Violation, ViolationCollector, ViolationKind,
    ViolationSource,
};
