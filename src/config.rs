//! Configuration management for the Pracht Alpha bridge
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{PrachtError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "PRACHT_CONFIG";
/// Environment override for `device.host`
pub const HOST_ENV: &str = "PRACHT_HOST";
/// Environment override for `device.password`
pub const PASSWORD_ENV: &str = "PRACHT_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wallbox connection parameters
    pub device: DeviceConfig,

    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// Wallbox connection parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Hostname or IP address of the wallbox (optionally with scheme/port)
    pub host: String,

    /// Device password used for login and automatic re-login
    pub password: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level; falls back to `level`
    pub console_level: Option<String>,

    /// Optional file level; falls back to `level`
    pub file_level: Option<String>,

    /// Path to log file (its directory is used for the rolling appender)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the REST API is served at all
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("host", &self.host)
            .field("password", &"<redacted>")
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl DeviceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first existing default location and apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::load_from_default_paths()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_default_paths() -> Result<Self> {
        let default_paths = [
            "pracht_config.yaml",
            "/data/pracht_config.yaml",
            "/etc/pracht/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Apply `PRACHT_HOST` / `PRACHT_PASSWORD` when set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(HOST_ENV)
            && !host.trim().is_empty()
        {
            self.device.host = host.trim().to_string();
        }
        if let Ok(password) = std::env::var(PASSWORD_ENV)
            && !password.is_empty()
        {
            self.device.password = password;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.device.host.trim().is_empty() {
            return Err(PrachtError::validation(
                "device.host",
                "Host cannot be empty",
            ));
        }

        if self.device.request_timeout_ms == 0 {
            return Err(PrachtError::validation(
                "device.request_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(PrachtError::validation(
                "poll_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(PrachtError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level).map_err(|_| {
            PrachtError::validation(
                "logging.level".to_string(),
                format!("Unknown log level '{}'", self.logging.level),
            )
        })?;

        Ok(())
    }
}
