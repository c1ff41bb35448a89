//! Owned image storage
//!
//! `ImageBuffer` is the growable byte store behind both slots and fetch
//! results. Growth goes through `ensure_capacity`, which either succeeds
//! or leaves the existing contents exactly as they were.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Deref;

use embedded_io::Read;

/// Most bytes handed to a single `read` call
pub const READ_CHUNK: usize = 4096;

/// Allocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AllocError;

/// Growable byte buffer with fallible growth
#[derive(Default)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
}

impl ImageBuffer {
    /// Empty buffer, no allocation
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Buffer with exactly `capacity` bytes reserved
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let mut buf = Self::new();
        buf.ensure_capacity(capacity)?;
        Ok(buf)
    }

    /// Make room for at least `total` bytes
    ///
    /// Never shrinks. On failure the buffer is unchanged.
    pub fn ensure_capacity(&mut self, total: usize) -> Result<(), AllocError> {
        if total <= self.bytes.capacity() {
            return Ok(());
        }
        let additional = total - self.bytes.len();
        self.bytes
            .try_reserve_exact(additional)
            .map_err(|_| AllocError)
    }

    /// Replace the contents with a copy of `src`
    pub fn replace_with(&mut self, src: &[u8]) -> Result<(), AllocError> {
        self.ensure_capacity(src.len())?;
        self.bytes.clear();
        self.bytes.extend_from_slice(src);
        Ok(())
    }

    /// Read once from `reader` into the free space after the current contents
    ///
    /// At most [`READ_CHUNK`] bytes are offered per call. The buffer never
    /// grows past `limit` bytes or its capacity, and never reallocates.
    /// Returns the number of bytes appended; 0 means
    /// there was no room or the reader hit end of stream.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R, limit: usize) -> Result<usize, R::Error> {
        let start = self.bytes.len();
        let room = self.bytes.capacity().min(limit).saturating_sub(start);
        if room == 0 {
            return Ok(0);
        }
        let end = start + room.min(READ_CHUNK);

        self.bytes.resize(end, 0);
        let result = reader.read(&mut self.bytes[start..]);
        let read = *result.as_ref().unwrap_or(&0);
        self.bytes.truncate(start + read);
        result
    }

    /// Valid length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Allocated capacity
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Whether no more bytes fit without growing
    pub fn is_full(&self) -> bool {
        self.bytes.len() == self.bytes.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for ImageBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl core::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("len", &self.bytes.len())
            .field("capacity", &self.bytes.capacity())
            .finish()
    }
}

/// A cheap, shareable handle to encoded image bytes
///
/// Cloning never copies the payload. Built-in assets are borrowed from
/// flash; fetched content is reference counted so a decoder can keep
/// reading it after the slot has moved on.
#[derive(Clone)]
pub enum ImageBytes {
    Static(&'static [u8]),
    Shared(Arc<ImageBuffer>),
}

impl ImageBytes {
    /// Both handles point at the same storage
    pub fn same_storage(&self, other: &ImageBytes) -> bool {
        match (self, other) {
            (ImageBytes::Shared(a), ImageBytes::Shared(b)) => Arc::ptr_eq(a, b),
            (ImageBytes::Static(a), ImageBytes::Static(b)) => a.as_ptr() == b.as_ptr(),
            _ => false,
        }
    }
}

impl Deref for ImageBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ImageBytes::Static(bytes) => bytes,
            ImageBytes::Shared(buf) => buf.as_slice(),
        }
    }
}

impl AsRef<[u8]> for ImageBytes {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl From<&'static [u8]> for ImageBytes {
    fn from(bytes: &'static [u8]) -> Self {
        ImageBytes::Static(bytes)
    }
}

impl From<ImageBuffer> for ImageBytes {
    fn from(buf: ImageBuffer) -> Self {
        ImageBytes::Shared(Arc::new(buf))
    }
}

impl core::fmt::Debug for ImageBytes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ImageBytes::Static(bytes) => write!(f, "Static({} bytes)", bytes.len()),
            ImageBytes::Shared(buf) => write!(f, "Shared({} bytes)", buf.len()),
        }
    }
}
