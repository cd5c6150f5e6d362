//! Error types for the Sweep orchestrator
//!
//! Every fallible operation in the core returns [`SweepResult`]. Errors are
//! split into two families that the state machine treats differently:
//! - local failures (a violation source, a single transformation, a gate)
//!   which are recorded and routed around
//! - fatal infrastructure failures (checkpoint store, working tree) which
//!   abort the run because further progress could not be made durable

mod constructors;
mod conversions;
mod types;

pub use types::{SweepError, SweepResult};
