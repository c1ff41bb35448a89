//! Configuration loading
//!
//! The device configuration is compiled in from device.toml and parsed
//! with the `toml` crate at startup.

pub mod loader;

pub use loader::{load_config, ConfigError};
