//! Firmware flash writer trait
//!
//! Modelled on a dual-partition OTA scheme: `begin` erases the inactive
//! partition, chunks are appended with `write`, and `complete` marks the
//! new image bootable. An update that is dropped or aborted leaves the
//! running firmware untouched.

/// Errors writing a firmware image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// No update partition available or one is already open
    Unavailable,
    /// Writing a chunk failed
    Write,
    /// The image did not validate or could not be activated
    Finalize,
}

impl core::fmt::Display for FlashError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FlashError::Unavailable => write!(f, "update partition unavailable"),
            FlashError::Write => write!(f, "flash write failed"),
            FlashError::Finalize => write!(f, "image finalize failed"),
        }
    }
}

/// An in-progress image write
pub trait FirmwareUpdate {
    /// Append a chunk
    fn write(&mut self, chunk: &[u8]) -> Result<(), FlashError>;

    /// Finish the write and select the new image for the next boot
    fn complete(self) -> Result<(), FlashError>;

    /// Discard everything written so far
    fn abort(self) -> Result<(), FlashError>;
}

/// Destination for firmware images
pub trait FirmwareSink {
    type Update<'a>: FirmwareUpdate
    where
        Self: 'a;

    /// Start writing a new image
    fn begin(&mut self) -> Result<Self::Update<'_>, FlashError>;
}
