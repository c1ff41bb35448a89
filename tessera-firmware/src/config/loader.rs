//! Embedded configuration loader
//!
//! Parses the compiled-in device.toml. Falls back to the built-in defaults
//! if it does not parse or validate.

use core::fmt;

use log::{info, warn};

use tessera_core::config::{DeviceConfig, ValidationError};

/// Embedded configuration (compiled into firmware)
/// Edit device.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../../device.toml");

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed
    Toml(toml::de::Error),
    /// Parsed values are inconsistent
    Invalid(ValidationError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Toml(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

impl From<ValidationError> for ConfigError {
    fn from(e: ValidationError) -> Self {
        ConfigError::Invalid(e)
    }
}

/// Parse and validate a TOML configuration
pub fn parse_config(source: &str) -> Result<DeviceConfig, ConfigError> {
    let config: DeviceConfig = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
}

/// Load the embedded configuration, or the defaults if it is unusable
pub fn load_config() -> DeviceConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            log_config_summary(&config);
            config
        }
        Err(e) => {
            warn!("Embedded config rejected ({}), using defaults", e);
            DeviceConfig::default()
        }
    }
}

fn log_config_summary(config: &DeviceConfig) {
    info!(
        "Config: remote={} timeout={}s buffer={}..{} bytes",
        config.remote.url,
        config.remote.timeout_secs,
        config.remote.initial_buffer,
        config.remote.max_image_size
    );
    info!(
        "Config: matrix {}x{} brightness={} serpentine={}",
        config.display.width,
        config.display.height,
        config.display.brightness,
        config.display.serpentine
    );
    info!(
        "Config: dwell={}s palette={} ota_max={} bytes",
        config.render.dwell_secs,
        config.render.palette.name(),
        config.ota.max_image_size
    );
}
