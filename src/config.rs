//! Configuration module for gator.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::{GatorError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/gator.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Aggregator (scheduler) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Seconds between poll cycles. Each cycle polls exactly one feed.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: i64,
    /// Restrict polling to the feeds followed by this user.
    #[serde(default)]
    pub scope_user: Option<String>,
}

fn default_interval_secs() -> i64 {
    60
}

impl AggregatorConfig {
    /// The poll interval as a duration.
    ///
    /// Zero and negative values are configuration errors.
    pub fn interval(&self) -> Result<Duration> {
        if self.interval_secs <= 0 {
            return Err(GatorError::Config(format!(
                "aggregator.interval_secs must be positive, got {}",
                self.interval_secs
            )));
        }
        Ok(Duration::from_secs(self.interval_secs as u64))
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            scope_user: None,
        }
    }
}

/// HTTP fetcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    format!("gator/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
        }
    }
}

/// Session state written by `gator login`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionConfig {
    /// User that commands act as when none is given explicitly.
    #[serde(default)]
    pub current_user: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Aggregator configuration.
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    /// Fetcher configuration.
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Logged-in user.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration like [`Config::load_with_env`], using defaults
    /// (plus environment overrides) when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load_with_env(path) {
            Err(GatorError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
            other => other,
        }
    }

    /// Persist `user` as the current user in the config file at `path`.
    ///
    /// Only `[session] current_user` is changed; other keys are kept. The
    /// file is created if it does not exist.
    pub fn save_current_user<P: AsRef<Path>>(path: P, user: &str) -> Result<()> {
        let path = path.as_ref();
        let mut document = match fs::read_to_string(path) {
            Ok(content) => content
                .parse::<toml::Table>()
                .map_err(|e| GatorError::Config(format!("config parse error: {e}")))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => return Err(GatorError::Io(e)),
        };

        let session = document
            .entry("session")
            .or_insert(toml::Value::Table(toml::Table::new()));
        let Some(session) = session.as_table_mut() else {
            return Err(GatorError::Config("[session] is not a table".to_string()));
        };
        session.insert(
            "current_user".to_string(),
            toml::Value::String(user.to_string()),
        );

        let content = toml::to_string(&document)
            .map_err(|e| GatorError::Config(format!("config write error: {e}")))?;
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DATABASE_PATH`: Override the database path
    /// - `GATOR_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("GATOR_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(level) = std::env::var("GATOR_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.aggregator.interval()?;

        if self.fetcher.connect_timeout_secs == 0 || self.fetcher.total_timeout_secs == 0 {
            return Err(GatorError::Config(
                "fetcher timeouts must be positive".to_string(),
            ));
        }
        if self.fetcher.max_feed_size_bytes == 0 {
            return Err(GatorError::Config(
                "fetcher.max_feed_size_bytes must be positive".to_string(),
            ));
        }
        if self.database.path.is_empty() {
            return Err(GatorError::Config("database.path is empty".to_string()));
        }
        Ok(())
    }
}
