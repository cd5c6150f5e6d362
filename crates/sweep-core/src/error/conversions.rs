//! Conversions from foreign error types

use super::types::SweepError;

impl From<std::io::Error> for SweepError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            message: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for SweepError {
    fn from(error: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML: {}", error))
    }
}

impl From<anyhow::Error> for SweepError {
    fn from(error: anyhow::Error) -> Self {
        Self::other(error.to_string())
    }
}

impl From<glob::PatternError> for SweepError {
    fn from(error: glob::PatternError) -> Self {
        Self::invalid_field("filter", format!("Invalid glob pattern: {}", error))
    }
}
