//! Configuration management for the orchestrator
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! `SWEEP_*` environment variables, then explicit overrides from the caller.

pub mod loader;
pub mod model;

pub use loader::{ConfigLoader, ConfigSource, DEFAULT_CONFIG_FILE};
pub use model::{
    CommandsConfig, FilterConfig, GatesConfig, OrchestratorSettings, PlannerConfig,
    QualityProfile, SweepConfig, TieBreaker,
};
