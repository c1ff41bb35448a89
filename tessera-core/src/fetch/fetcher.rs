//! Remote content fetcher
//!
//! One GET per call. The receive buffer starts at a default size and is
//! sized exactly once to the server's declared length; without a
//! declaration it doubles as data arrives. Either way it never exceeds the
//! configured maximum, and nothing is returned on failure.

use tessera_protocol::{Directives, MAX_BRIGHTNESS};

use crate::error::{Classify, ErrorClass};
use crate::palette::PaletteMode;
use crate::slots::{ImageBuffer, MetaUpdate};
use crate::traits::{HttpClient, HttpResponse, TransportError};

/// Default receive buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Hard cap on image size
pub const MAX_IMAGE_SIZE: usize = 512 * 1024;

/// Buffer sizing limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FetchLimits {
    /// Initial allocation
    pub initial: usize,
    /// Largest body accepted
    pub max: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            initial: DEFAULT_BUFFER_SIZE,
            max: MAX_IMAGE_SIZE,
        }
    }
}

/// Values used when the response carries no directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayDefaults {
    pub brightness: u8,
    pub dwell_secs: u32,
    pub palette: PaletteMode,
}

impl DisplayDefaults {
    /// Same defaults with brightness replaced by the value last applied
    ///
    /// A response without a brightness header keeps the panel where it is.
    pub fn with_brightness(self, brightness: u8) -> Self {
        Self {
            brightness: brightness.min(MAX_BRIGHTNESS),
            ..self
        }
    }
}

/// Fetch errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchError {
    /// Request failed or the stream broke off
    Network(TransportError),
    /// Non-2xx response
    Status(u16),
    /// Body larger than the configured maximum
    TooLarge,
    /// Could not allocate the receive buffer
    OutOfMemory,
    /// Stream ended before the declared length
    Truncated,
}

impl core::fmt::Display for FetchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FetchError::Network(e) => write!(f, "network: {}", e),
            FetchError::Status(code) => write!(f, "HTTP {}", code),
            FetchError::TooLarge => write!(f, "image too large"),
            FetchError::OutOfMemory => write!(f, "out of memory"),
            FetchError::Truncated => write!(f, "body truncated"),
        }
    }
}

impl Classify for FetchError {
    fn class(&self) -> ErrorClass {
        match self {
            FetchError::TooLarge | FetchError::OutOfMemory => ErrorClass::ResourceExhaustion,
            _ => ErrorClass::Transient,
        }
    }
}

/// A fetched image and its display directives
///
/// The caller owns the buffer.
#[derive(Debug)]
pub struct FetchResult {
    pub buffer: ImageBuffer,
    /// Brightness percent, 0-100
    pub brightness: u8,
    pub dwell_secs: u32,
    pub palette: PaletteMode,
}

impl FetchResult {
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Slot metadata for this image
    pub fn meta(&self) -> MetaUpdate {
        MetaUpdate::new(self.dwell_secs, self.palette)
    }
}

/// Bounded HTTP image fetcher
#[derive(Debug, Clone, Copy)]
pub struct RemoteFetcher {
    limits: FetchLimits,
}

impl RemoteFetcher {
    pub const fn new(limits: FetchLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    /// Fetch one image
    pub fn fetch<C: HttpClient>(
        &self,
        client: &mut C,
        url: &str,
        defaults: DisplayDefaults,
    ) -> Result<FetchResult, FetchError> {
        let mut response = client.get(url).map_err(FetchError::Network)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }

        let directives = Directives::from_lookup(|name| response.header(name));
        let declared = response.content_length();

        let initial = self.limits.initial.min(self.limits.max);
        let mut buffer = ImageBuffer::with_capacity(initial).map_err(|_| FetchError::OutOfMemory)?;

        match declared {
            Some(len) if len > self.limits.max => return Err(FetchError::TooLarge),
            Some(len) => {
                buffer
                    .ensure_capacity(len)
                    .map_err(|_| FetchError::OutOfMemory)?;
                read_declared(&mut response, &mut buffer, len)?;
            }
            None => read_unbounded(&mut response, &mut buffer, self.limits.max)?,
        }

        Ok(FetchResult {
            buffer,
            brightness: directives.brightness.unwrap_or(defaults.brightness),
            dwell_secs: directives.dwell_secs.unwrap_or(defaults.dwell_secs),
            palette: directives
                .palette
                .map(PaletteMode::from_index)
                .unwrap_or(defaults.palette),
        })
    }
}

fn read_declared<R: HttpResponse>(
    response: &mut R,
    buffer: &mut ImageBuffer,
    len: usize,
) -> Result<(), FetchError> {
    while buffer.len() < len {
        let read = buffer
            .fill_from(response, len)
            .map_err(|_| FetchError::Network(TransportError::Interrupted))?;
        if read == 0 {
            return Err(FetchError::Truncated);
        }
    }
    Ok(())
}

fn read_unbounded<R: HttpResponse>(
    response: &mut R,
    buffer: &mut ImageBuffer,
    max: usize,
) -> Result<(), FetchError> {
    loop {
        if buffer.len() >= max {
            // Anything past the cap means the image is too big
            let mut probe = [0u8; 1];
            let extra = response
                .read(&mut probe)
                .map_err(|_| FetchError::Network(TransportError::Interrupted))?;
            return if extra == 0 {
                Ok(())
            } else {
                Err(FetchError::TooLarge)
            };
        }
        if buffer.is_full() {
            let grown = buffer.capacity().saturating_mul(2).clamp(1, max);
            buffer
                .ensure_capacity(grown)
                .map_err(|_| FetchError::OutOfMemory)?;
        }

        let read = buffer
            .fill_from(response, max)
            .map_err(|_| FetchError::Network(TransportError::Interrupted))?;
        if read == 0 {
            return Ok(());
        }
    }
}
