//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `orderflow.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Delayed action worker settings.
    pub worker: WorkerConfig,
    /// Trigger event intake.
    pub ingest: IngestConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Pool size for file databases.
    pub max_connections: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Delayed action worker configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,
    /// Pause between two polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of due actions handled per poll.
    pub batch_size: usize,
}

/// Where trigger events come from.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Read newline-delimited JSON trigger events from standard input.
    pub stdin: bool,
}

impl Config {
    /// Load configuration from `orderflow.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting values are invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("orderflow.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides read through `lookup` (the process environment in
    /// production). Unparsable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("ORDERFLOW_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("ORDERFLOW_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("ORDERFLOW_WORKER_ENABLED").and_then(|v| parse_bool(&v)) {
            self.worker.enabled = val;
        }
        if let Some(val) = lookup("ORDERFLOW_WORKER_POLL_MS").and_then(|v| v.parse().ok()) {
            self.worker.poll_interval_ms = val;
        }
        if let Some(val) = lookup("ORDERFLOW_WORKER_BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.worker.batch_size = val;
        }
        if let Some(val) = lookup("ORDERFLOW_INGEST_STDIN").and_then(|v| parse_bool(&v)) {
            self.ingest.stdin = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be non-zero".to_string(),
            ));
        }
        if self.worker.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "worker.poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.worker.batch_size == 0 {
            return Err(ConfigError::Validation(
                "worker.batch_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl WorkerConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:orderflow.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "orderflow=info,sqlx=warn".to_string(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 1_000,
            batch_size: 100,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
