//! Violation model and collection
//!
//! Violations are recomputed from the external analyzers on every
//! Analyzing phase and discarded at the end of the cycle; nothing mutates
//! them in place.

pub mod collector;
pub mod source;
pub mod types;

pub use collector::{Collection, Degradation, ViolationCollector};
pub use source::{FeedEntry, FileSignals, SignalSource, SourceReport, ViolationSource};
pub use types::{Project, Revision, Violation, ViolationKind};
