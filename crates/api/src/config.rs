//! Service Configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! variables such as `VSENSOR__SERVER__BIND_ADDR`.

use crate::ApiError;
use ::config::{Config, Environment, File};
use classifier_manager::ManagerConfig;
use serde::Deserialize;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "virtual-sensor.toml";

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub classifier: ManagerConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind_addr: String,
    /// Owner applied to every request until authentication exists
    pub default_owner: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            default_owner: "default".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (or [`DEFAULT_CONFIG_FILE`]) and the
    /// environment. A missing file is not an error.
    pub fn load(path: Option<&str>) -> Result<Self, ApiError> {
        let config: AppConfig = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(false))
            .add_source(
                Environment::with_prefix("VSENSOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}
