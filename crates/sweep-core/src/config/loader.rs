//! Configuration loading and layering

use crate::config::model::SweepConfig;
use crate::error::{SweepError, SweepResult};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::{Table, Value};

/// Default configuration file, relative to the project root
pub const DEFAULT_CONFIG_FILE: &str = ".sweep/config.toml";

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Configuration from a TOML file
    File(PathBuf),
    /// Configuration from `SWEEP_*` environment variables
    Environment,
    /// Explicit overrides, keyed like the environment variables without prefix
    Overrides(HashMap<String, String>),
    /// Default configuration
    Default,
}

/// Configuration loader with support for multiple sources
///
/// Sources are applied in the order they were added; later sources win.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    /// Add environment variables source
    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Add explicit overrides
    pub fn with_overrides(self, overrides: HashMap<String, String>) -> Self {
        self.add_source(ConfigSource::Overrides(overrides))
    }

    /// Add default configuration source
    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    /// Load configuration from all sources and validate the result.
    ///
    /// Layers are merged key by key, so a later file only replaces the
    /// keys it actually sets.
    pub fn load(self) -> SweepResult<SweepConfig> {
        let mut layers = Table::new();

        for source in &self.sources {
            match source {
                ConfigSource::File(path) => {
                    tracing::debug!("Loading config from file: {}", path.display());
                    if let Some(table) = load_from_file(path)? {
                        merge_tables(&mut layers, table);
                    }
                }
                ConfigSource::Environment => {
                    tracing::debug!("Loading config from environment");
                    let vars: HashMap<String, String> = env::vars()
                        .filter_map(|(key, value)| {
                            key.strip_prefix("SWEEP_").map(|k| (k.to_string(), value))
                        })
                        .collect();
                    merge_tables(&mut layers, overrides_table(&vars)?);
                }
                ConfigSource::Overrides(values) => {
                    tracing::debug!("Applying {} config overrides", values.len());
                    merge_tables(&mut layers, overrides_table(values)?);
                }
                ConfigSource::Default => {
                    tracing::debug!("Loading default config");
                }
            }
        }

        let mut config = Value::Table(layers)
            .try_into::<SweepConfig>()
            .map_err(|e| SweepError::config(format!("Invalid configuration: {}", e)))?;

        config.orchestrator.checkpoint_dir = expand_path(&config.orchestrator.checkpoint_dir);
        if let Some(ignore_file) = config.filter.ignore_file.as_ref() {
            config.filter.ignore_file = Some(expand_path(ignore_file));
        }

        config.validate()?;
        Ok(config)
    }
}

/// Read one layer; a missing file contributes nothing
fn load_from_file(path: &Path) -> SweepResult<Option<Table>> {
    if !path.exists() {
        tracing::debug!("Config file {} not found, skipping", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        SweepError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;
    let invalid = |e: toml::de::Error| {
        SweepError::config_with_context(
            format!("Invalid config file: {}", e),
            format!("Parsing '{}'", path.display()),
        )
    };

    let table: Table = toml::from_str(&content).map_err(invalid)?;
    // Type errors are reported against the file that caused them
    Value::Table(table.clone())
        .try_into::<SweepConfig>()
        .map_err(invalid)?;
    Ok(Some(table))
}

/// Later keys win; nested tables are merged rather than replaced
fn merge_tables(base: &mut Table, layer: Table) {
    for (key, value) in layer {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Turn `KEY=value` overrides such as `WORKERS=8` or `MAX_RUNTIME=2h` into
/// a configuration layer
fn overrides_table(values: &HashMap<String, String>) -> SweepResult<Table> {
    let mut orchestrator = Table::new();
    if let Some(raw) = values.get("WORKERS") {
        orchestrator.insert("workers".into(), integer("WORKERS", raw)?);
    }
    if let Some(raw) = values.get("BATCH_SIZE") {
        orchestrator.insert("batch_size".into(), integer("BATCH_SIZE", raw)?);
    }
    if let Some(raw) = values.get("MAX_CYCLES") {
        orchestrator.insert("max_cycles".into(), integer("MAX_CYCLES", raw)?);
    }
    if let Some(raw) = values.get("MAX_ATTEMPTS") {
        orchestrator.insert("max_attempts_per_file".into(), integer("MAX_ATTEMPTS", raw)?);
    }
    if let Some(raw) = values.get("MAX_RUNTIME") {
        parse_duration("MAX_RUNTIME", raw)?;
        orchestrator.insert("max_runtime".into(), Value::String(raw.trim().to_string()));
    }
    if let Some(raw) = values.get("CHECKPOINT_DIR") {
        orchestrator.insert("checkpoint_dir".into(), Value::String(raw.clone()));
    }

    let mut layer = Table::new();
    if !orchestrator.is_empty() {
        layer.insert("orchestrator".into(), Value::Table(orchestrator));
    }
    if let Some(raw) = values.get("COVERAGE_MIN") {
        let mut quality = Table::new();
        quality.insert(
            "coverage_min".into(),
            Value::Float(parse_number("COVERAGE_MIN", raw)?),
        );
        layer.insert("quality".into(), Value::Table(quality));
    }
    Ok(layer)
}

fn integer(key: &str, raw: &str) -> SweepResult<Value> {
    parse_number::<u32>(key, raw).map(|n| Value::Integer(n.into()))
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> SweepResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SweepError::invalid_field(key, format!("'{}' is not a valid number", raw)))
}

fn parse_duration(key: &str, raw: &str) -> SweepResult<Duration> {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        #[serde(with = "humantime_serde")]
        value: Duration,
    }

    let doc = format!("value = {:?}", raw.trim());
    toml::from_str::<Wrapper>(&doc)
        .map(|w| w.value)
        .map_err(|_| SweepError::invalid_field(key, format!("'{}' is not a valid duration", raw)))
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// User-level configuration file, if the platform has a config directory
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sweep").join("config.toml"))
}
