//! Collaborators backed by configured shell commands
//!
//! Each adapter implements one of the core seams ([`ViolationSource`],
//! [`SignalSource`], [`QualityOracle`], [`Transformer`]) by running a
//! command in the project root and reading its exit status or JSON output.
//!
//! [`ViolationSource`]: crate::violation::ViolationSource
//! [`SignalSource`]: crate::violation::SignalSource
//! [`QualityOracle`]: crate::validation::QualityOracle
//! [`Transformer`]: crate::executor::Transformer

mod command;
mod oracle;
mod sources;
mod transformer;
mod wiring;

pub use command::{CommandLine, CommandOutput};
pub use oracle::CommandOracle;
pub use sources::{CommandSignalSource, CommandViolationSource};
pub use transformer::CommandTransformer;
