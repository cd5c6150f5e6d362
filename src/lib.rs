//! Sweep: quality-driven refactor orchestrator
//!
//! Facade over [`sweep_core`]. See the `sweep` binary for the operator CLI.

pub use sweep_core::*;
