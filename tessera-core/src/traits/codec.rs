//! Animated image codec trait
//!
//! The codec is consumed through a narrow capability: open an encoded
//! buffer, pull decoded RGBA frames with their timestamps, rewind for the
//! next loop. Dropping the decoder releases it.

use crate::error::{Classify, ErrorClass};
use crate::slots::ImageBytes;

/// Errors reported by a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Not a format the codec understands
    Unsupported,
    /// Bitstream is damaged
    Corrupt,
    /// Decoder could not allocate its frame buffers
    OutOfMemory,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CodecError::Unsupported => write!(f, "unsupported image"),
            CodecError::Corrupt => write!(f, "corrupt image data"),
            CodecError::OutOfMemory => write!(f, "decoder out of memory"),
        }
    }
}

impl Classify for CodecError {
    fn class(&self) -> ErrorClass {
        match self {
            CodecError::Unsupported => ErrorClass::Malformed,
            CodecError::Corrupt => ErrorClass::Transient,
            CodecError::OutOfMemory => ErrorClass::ResourceExhaustion,
        }
    }
}

/// Canvas properties known once a buffer is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanvasInfo {
    pub width: u16,
    pub height: u16,
    /// Declared loop count, 0 = loop forever
    pub loop_count: u32,
    /// Frames per loop (1 for still images)
    pub frame_count: u32,
}

/// One decoded frame
///
/// `pixels` is row-major RGBA covering the whole canvas. It is handed out
/// mutably so the palette can be applied in place.
pub struct DecodedFrame<'a> {
    pub pixels: &'a mut [u8],
    /// Presentation time of this frame from the start of the loop, ms
    pub timestamp_ms: u32,
}

/// An open decoding session
pub trait FrameDecoder {
    /// Canvas properties
    fn info(&self) -> CanvasInfo;

    /// Decode the next frame, or `None` at the end of the sequence
    fn next_frame(&mut self) -> Result<Option<DecodedFrame<'_>>, CodecError>;

    /// Rewind to the first frame
    fn reset(&mut self) -> Result<(), CodecError>;
}

/// Factory for decoding sessions
pub trait Codec {
    type Decoder: FrameDecoder;

    /// Open an encoded buffer
    ///
    /// The decoder keeps its own handle on `image`, so the slot may be
    /// rewritten while the session is alive.
    fn open(&mut self, image: ImageBytes) -> Result<Self::Decoder, CodecError>;
}
