//! Project-wide quality gates run after every batch

pub mod oracle;
pub mod report;
pub mod validator;

#[cfg(test)]
pub use oracle::MockQualityOracle;
pub use oracle::{GateReport, QualityOracle};
pub use report::{FileVerdict, Gate, GateResult, GateStatus, ValidationReport};
pub use validator::Validator;
