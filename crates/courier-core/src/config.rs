//! Configuration management for the courier delivery core.
//!
//! This module provides the configuration system used by the `courier` binary:
//! - Loading from YAML files
//! - Environment variable overrides (`COURIER__SECTION__FIELD`)
//! - Validation of all settings
//! - Backend, routing provider, tracking, map, and logging sections

use crate::error::ConfigError;
use crate::types::TravelMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Result type for configuration loading and validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
///
/// Every section is optional in the YAML file and falls back to its defaults.
///
/// # Examples
///
/// ```
/// use courier_core::config::AppConfig;
///
/// let config = AppConfig::from_yaml("routing:\n  mode: car\n").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Shipping assignment backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// External routing provider
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Position tracking and reporting
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Map rendering parameters
    #[serde(default)]
    pub map: MapConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::InvalidFormat {
            reason: e.to_string(),
        })
    }

    /// Loads configuration using the `config` crate, layering the YAML file
    /// under `COURIER__*` environment variables.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (COURIER__ROUTING__API_KEY, ...)
            .add_source(
                config::Environment::with_prefix("COURIER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::InvalidFormat {
                reason: e.to_string(),
            })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_base_url("backend.base_url", &self.backend.base_url)?;
        validate_base_url("routing.base_url", &self.routing.base_url)?;

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "backend.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.routing.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "routing.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.tracking.position_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "tracking.position_timeout_secs",
                "must be greater than zero",
            ));
        }
        if let Some(url) = &self.tracking.report_url {
            validate_base_url("tracking.report_url", url)?;
        }

        self.map.validate()?;
        self.logging.parse_level()?;

        Ok(())
    }
}

fn validate_base_url(field: &str, url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::invalid_value(field, "cannot be empty"));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::invalid_value(
            field,
            format!("'{}' must start with http:// or https://", url),
        ));
    }
    Ok(())
}

/// Shipping assignment backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend REST API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_backend_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Routing provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Base URL of the directions API
    #[serde(default = "default_routing_url")]
    pub base_url: String,

    /// Provider API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default travel mode
    #[serde(default)]
    pub mode: TravelMode,

    /// Request timeout in seconds
    #[serde(default = "default_routing_timeout")]
    pub timeout_secs: u64,
}

fn default_routing_url() -> String {
    "https://rsapi.goong.io".to_string()
}

fn default_routing_timeout() -> u64 {
    15
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: default_routing_url(),
            api_key: None,
            mode: TravelMode::default(),
            timeout_secs: default_routing_timeout(),
        }
    }
}

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Position tracking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Timeout for a one-shot position fetch
    #[serde(default = "default_position_timeout")]
    pub position_timeout_secs: u64,

    /// Endpoint receiving live positions; reports are only logged when unset
    #[serde(default)]
    pub report_url: Option<String>,

    /// Interval between replayed positions in simulation
    #[serde(default = "default_replay_interval")]
    pub replay_interval_ms: u64,
}

fn default_position_timeout() -> u64 {
    15
}

fn default_replay_interval() -> u64 {
    1000
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            position_timeout_secs: default_position_timeout(),
            report_url: None,
            replay_interval_ms: default_replay_interval(),
        }
    }
}

impl TrackingConfig {
    pub fn position_timeout(&self) -> Duration {
        Duration::from_secs(self.position_timeout_secs)
    }

    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }
}

/// Map rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Padding in pixels around fitted bounds
    #[serde(default = "default_fit_padding")]
    pub fit_padding_px: f64,

    /// Zoom level used when focusing a single point
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: f64,
}

fn default_fit_padding() -> f64 {
    50.0
}

fn default_focus_zoom() -> f64 {
    15.0
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            fit_padding_px: default_fit_padding(),
            focus_zoom: default_focus_zoom(),
        }
    }
}

impl MapConfig {
    /// Validates padding and zoom.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.fit_padding_px.is_finite() || self.fit_padding_px < 0.0 {
            return Err(ConfigError::invalid_value(
                "map.fit_padding_px",
                "must be a non-negative number",
            ));
        }
        if !self.focus_zoom.is_finite() || self.focus_zoom <= 0.0 {
            return Err(ConfigError::invalid_value(
                "map.focus_zoom",
                "must be a positive number",
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Whether to include file/line info
    #[serde(default)]
    pub file_line: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
            file_line: false,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> ConfigResult<Level> {
        self.level.parse().map_err(|_| ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("Invalid log level: {}", self.level),
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}
