//! Configuration for the quarry CLI
//!
//! Loads configuration from:
//! 1. quarry.yaml - site file, database and logging settings
//! 2. .env file - loaded into the environment at startup
//!
//! Environment variables always override quarry.yaml values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },
}

/// Execution limits for delegated statements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// DuckDB database file, in-memory when absent
    #[serde(default)]
    pub database: Option<PathBuf>,

    #[serde(default)]
    pub max_rows: Option<u64>,

    #[serde(default)]
    pub max_memory_mb: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stderr, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            output: "stderr".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Site definition file
    #[serde(default = "default_site")]
    pub site: PathBuf,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_site() -> PathBuf {
    PathBuf::from("site.yaml")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: default_site(),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.with_overrides(env_var)
    }

    /// Like `load`, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Config::default().with_overrides(env_var)
        }
    }

    /// Override settings from variables looked up through `var`
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(site) = var("QUARRY_SITE") {
            self.site = PathBuf::from(site);
        }
        if let Some(database) = var("QUARRY_DATABASE") {
            self.execution.database = Some(PathBuf::from(database));
        }
        if let Some(max_rows) = parse_u64(&var, "QUARRY_MAX_ROWS")? {
            self.execution.max_rows = Some(max_rows);
        }
        if let Some(max_memory_mb) = parse_u64(&var, "QUARRY_MAX_MEMORY_MB")? {
            self.execution.max_memory_mb = Some(max_memory_mb);
        }

        if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(output) = var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Some(dir) = var("LOG_DIR") {
            self.logging.directory = dir;
        }

        Ok(self)
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_u64(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>, ConfigError> {
    match var(name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvVar {
                name: name.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
