//! Configuration system for tessera.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{TesseraError, TesseraResult};

/// Path value that selects an in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Bounded exponential backoff for callers that retry conflicting updates.
///
/// The core never retries on its own; this only parameterises caller-side
/// retry loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 10,
            max_delay_ms: 500,
            multiplier: 2.0_f32,
        }
    }
}

/// Main tessera configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    /// SQLite database file, or `:memory:`.
    pub database_path: PathBuf,
    /// How long a writer waits on a locked database file.
    pub busy_timeout_ms: u64,
    /// Capacity of the lifecycle event channel.
    pub event_bus_capacity: usize,
    /// Retry policy for callers resubmitting after a conflict.
    pub conflict_retry: RetryPolicy,
}

impl Default for TesseraConfig {
    fn default() -> Self {
        let tessera_dir = dirs::home_dir()
            .map(|h| h.join(".tessera"))
            .unwrap_or_else(|| PathBuf::from(".tessera"));

        Self {
            database_path: tessera_dir.join("tessera.db"),
            busy_timeout_ms: 5_000,
            event_bus_capacity: 1024,
            conflict_retry: RetryPolicy::default(),
        }
    }
}

impl TesseraConfig {
    /// Configuration for a throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            ..Self::default()
        }
    }

    /// Whether the database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> TesseraResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| TesseraError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| TesseraError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| TesseraError::Configuration(e.to_string())),
            _ => Err(TesseraError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> TesseraResult<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from a variable lookup onto this configuration.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> TesseraResult<Self> {
        if let Some(path) = lookup("TESSERA_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("TESSERA_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = parse_var("TESSERA_BUSY_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("TESSERA_EVENT_BUS_CAPACITY") {
            self.event_bus_capacity = parse_var("TESSERA_EVENT_BUS_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("TESSERA_CONFLICT_MAX_RETRIES") {
            self.conflict_retry.max_retries = parse_var("TESSERA_CONFLICT_MAX_RETRIES", &value)?;
        }
        Ok(self)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> TesseraConfigBuilder {
        TesseraConfigBuilder::default()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> TesseraResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TesseraError::Configuration(format!("{} has invalid value '{}'", key, value)))
}

/// Builder for TesseraConfig.
#[derive(Default)]
pub struct TesseraConfigBuilder {
    config: TesseraConfig,
}

impl TesseraConfigBuilder {
    /// Set database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Use an in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.config.database_path = PathBuf::from(IN_MEMORY_PATH);
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// Set event bus capacity.
    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.config.event_bus_capacity = capacity;
        self
    }

    /// Set conflict retry policy.
    pub fn conflict_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.conflict_retry = policy;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TesseraConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_builder() {
        let config = TesseraConfig::builder()
            .in_memory()
            .busy_timeout_ms(250)
            .event_bus_capacity(16)
            .build();
        assert!(config.is_in_memory());
        assert_eq!(config.busy_timeout_ms, 250);
        assert_eq!(config.event_bus_capacity, 16);
        assert_eq!(config.conflict_retry, RetryPolicy::default());
    }

    #[test]
    fn test_from_toml_file_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database_path = \"/tmp/catalog.db\"").unwrap();
        writeln!(file, "[conflict_retry]").unwrap();
        writeln!(file, "max_retries = 7").unwrap();

        let config = TesseraConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/catalog.db"));
        assert_eq!(config.conflict_retry.max_retries, 7);
        assert_eq!(config.conflict_retry.initial_delay_ms, 10);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_from_yaml_and_json_files() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "database_path: \":memory:\"").unwrap();
        writeln!(yaml, "event_bus_capacity: 8").unwrap();
        let config = TesseraConfig::from_file(yaml.path()).unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.event_bus_capacity, 8);

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, "{{\"busy_timeout_ms\": 42}}").unwrap();
        let config = TesseraConfig::from_file(json.path()).unwrap();
        assert_eq!(config.busy_timeout_ms, 42);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = TesseraConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TesseraError::Configuration(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("TESSERA_DATABASE_PATH", ":memory:"),
            ("TESSERA_CONFLICT_MAX_RETRIES", "5"),
        ]);
        let config = TesseraConfig::default()
            .with_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.conflict_retry.max_retries, 5);

        let err = TesseraConfig::default()
            .with_env_overrides(|k| (k == "TESSERA_BUSY_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("TESSERA_BUSY_TIMEOUT_MS"));
    }
}
