//! Core error types and their classification

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type SweepResult<T> = Result<T, SweepError>;

/// Main error type for the orchestrator
#[derive(Error, Debug, Clone)]
pub enum SweepError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Working tree IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// Checkpoint persistence errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// A violation source could not be queried
    #[error("Collection error: {source_name}: {message}")]
    Collection {
        source_name: String,
        message: String,
    },

    /// The transformation capability failed for a file
    #[error("Transform error: {}: {message}", file.display())]
    Transform { file: PathBuf, message: String },

    /// A quality gate could not be evaluated
    #[error("Validation error: {gate}: {message}")]
    Validation { gate: String, message: String },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Operation was cancelled
    #[error("Operation was cancelled")]
    Cancelled,

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}

impl SweepError {
    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "SWEEP_CONFIG",
            Self::Io { .. } => "SWEEP_IO",
            Self::Json { .. } => "SWEEP_JSON",
            Self::Storage { .. } => "SWEEP_STORAGE",
            Self::Collection { .. } => "SWEEP_COLLECTION",
            Self::Transform { .. } => "SWEEP_TRANSFORM",
            Self::Validation { .. } => "SWEEP_VALIDATION",
            Self::InvalidInput { .. } => "SWEEP_INVALID_INPUT",
            Self::Cancelled => "SWEEP_CANCELLED",
            Self::Other { .. } => "SWEEP_OTHER",
        }
    }

    /// Whether the error means progress can no longer be made durable.
    ///
    /// Storage failures and working-tree IO failures are fatal; a run that
    /// hits one transitions to `Aborted` instead of continuing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io { .. })
    }
}
