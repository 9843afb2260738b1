//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `verdant.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Device polling settings.
    pub poller: PollerConfig,
    /// Local pin settings.
    pub gpio: GpioConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Device poll supervisor configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Per-request timeout for device status fetches, in seconds.
    pub fetch_timeout_secs: u64,
}

/// Pin supervisor configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// INPUT watcher poll interval, in milliseconds.
    pub watcher_interval_ms: u64,
}

impl Config {
    /// Load configuration from `verdant.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or
    /// if a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("verdant.toml")?;
        config.apply_env_overrides();
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

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("VERDANT_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("VERDANT_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.poller.fetch_timeout_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("VERDANT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poller.fetch_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch timeout must be non-zero".to_string(),
            ));
        }
        if self.gpio.watcher_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "watcher interval must be non-zero".to_string(),
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

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:verdant.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "verdantd=info,verdant=info".to_string(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 5,
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            watcher_interval_ms: 100,
        }
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
