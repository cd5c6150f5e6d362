//! The orchestrator state machine and its two drivers
//!
//! ```text
//! Analyzing -> Planning -> Executing -> Validating -> Checkpointing -> Analyzing
//!                 ^                          |
//!                 +------- Reverting <-------+
//! ```
//!
//! Planning reaches `Complete` when nothing can be scheduled. Interrupts
//! and budgets reach `Aborted` at batch boundaries only; fatal storage or
//! working tree failures reach it immediately.

pub mod batch;
pub mod engine;
pub mod interactive;
pub mod machine;
pub mod observer;
pub mod preview;
pub mod state;
pub mod status;

pub use batch::Orchestrator;
pub use engine::{Engine, EngineBuilder};
pub use interactive::{InteractiveDriver, Session, SessionOutcome};
pub use machine::{RunContext, RunSummary, StartMode};
pub use observer::{CommitEvent, CommitObserver};
pub use preview::DryRun;
pub use state::{AbortReason, OrchestratorState, RunOutcome};
pub use status::{FileNote, OrchestratorHandle, StatusReport};

#[cfg(test)]
mod tests;
