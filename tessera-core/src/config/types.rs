//! Configuration type definitions

use embassy_time::Duration;
use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fetch::{DisplayDefaults, FetchLimits, DEFAULT_BUFFER_SIZE, MAX_IMAGE_SIZE};
use crate::ota::OTA_POLL_INTERVAL;
use crate::palette::PaletteMode;

/// Maximum URL length
pub const MAX_URL_LEN: usize = 256;

/// Default content URL
pub const DEFAULT_REMOTE_URL: &str = "http://tessera.local:8000/next";

/// Largest accepted firmware image
pub const DEFAULT_OTA_MAX_IMAGE: u32 = 4 * 1024 * 1024;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// Content URL is empty or not http(s)
    BadUrl,
    /// Buffer limits are zero or inverted
    BadLimits,
    /// Matrix has no pixels
    BadGeometry,
    /// Brightness above 100 percent
    BadBrightness,
    /// A timing value is zero or inverted
    BadTiming,
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ValidationError::BadUrl => write!(f, "remote.url must be an http(s) URL"),
            ValidationError::BadLimits => {
                write!(f, "remote.initial_buffer must be in 1..=remote.max_image_size")
            }
            ValidationError::BadGeometry => write!(f, "display width and height must be non-zero"),
            ValidationError::BadBrightness => write!(f, "display.brightness must be 0-100"),
            ValidationError::BadTiming => write!(f, "timing values must be non-zero"),
        }
    }
}

/// Content service settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RemoteConfig {
    /// URL polled for the next image
    pub url: String<MAX_URL_LEN>,
    /// Request timeout in seconds
    pub timeout_secs: u32,
    /// Initial receive buffer in bytes
    pub initial_buffer: u32,
    /// Largest image accepted in bytes
    pub max_image_size: u32,
    /// Shortest time between fetches in seconds
    pub min_refresh_secs: u32,
    /// Longest retry delay in seconds
    pub max_backoff_secs: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let mut url = String::new();
        // The default fits
        let _ = url.push_str(DEFAULT_REMOTE_URL);
        Self {
            url,
            timeout_secs: 10,
            initial_buffer: DEFAULT_BUFFER_SIZE as u32,
            max_image_size: MAX_IMAGE_SIZE as u32,
            min_refresh_secs: 2,
            max_backoff_secs: 60,
        }
    }
}

impl RemoteConfig {
    pub fn limits(&self) -> FetchLimits {
        FetchLimits {
            initial: self.initial_buffer as usize,
            max: self.max_image_size as usize,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }

    pub fn min_refresh(&self) -> Duration {
        Duration::from_secs(self.min_refresh_secs as u64)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs as u64)
    }
}

/// LED matrix settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfig {
    pub width: u16,
    pub height: u16,
    /// Brightness at boot, 0-100
    pub brightness: u8,
    /// Odd rows run right to left
    pub serpentine: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            brightness: 30,
            serpentine: true,
        }
    }
}

/// Playback defaults for content without directives
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
    /// Seconds each image stays up, 0 = until replaced
    pub dwell_secs: u32,
    pub palette: PaletteMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dwell_secs: 10,
            palette: PaletteMode::Normal,
        }
    }
}

/// Firmware update settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OtaConfig {
    /// Largest firmware image accepted in bytes
    pub max_image_size: u32,
    /// Status poll interval while an update runs, in milliseconds
    pub poll_interval_ms: u32,
    /// Port of the update intake server
    pub http_port: u16,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            max_image_size: DEFAULT_OTA_MAX_IMAGE,
            poll_interval_ms: OTA_POLL_INTERVAL.as_millis() as u32,
            http_port: 80,
        }
    }
}

impl OtaConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }
}

/// Complete device configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    pub remote: RemoteConfig,
    pub display: DisplayConfig,
    pub render: RenderConfig,
    pub ota: OtaConfig,
}

impl DeviceConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.remote.url.as_str();
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .ok_or(ValidationError::BadUrl)?;
        if rest.is_empty() || rest.starts_with('/') {
            return Err(ValidationError::BadUrl);
        }

        if self.remote.initial_buffer == 0
            || self.remote.initial_buffer > self.remote.max_image_size
        {
            return Err(ValidationError::BadLimits);
        }

        if self.display.width == 0 || self.display.height == 0 {
            return Err(ValidationError::BadGeometry);
        }
        if self.display.brightness > 100 {
            return Err(ValidationError::BadBrightness);
        }

        if self.remote.timeout_secs == 0
            || self.remote.min_refresh_secs == 0
            || self.remote.max_backoff_secs < self.remote.min_refresh_secs
            || self.ota.poll_interval_ms == 0
            || self.ota.max_image_size == 0
        {
            return Err(ValidationError::BadTiming);
        }

        Ok(())
    }

    /// Values used when fetched content carries no directives
    pub fn display_defaults(&self) -> DisplayDefaults {
        DisplayDefaults {
            brightness: self.display.brightness,
            dwell_secs: self.render.dwell_secs,
            palette: self.render.palette,
        }
    }
}
