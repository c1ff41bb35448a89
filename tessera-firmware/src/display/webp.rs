//! WebP codec adapter
//!
//! Wraps `image-webp` behind the core `Codec` trait. Frames are always
//! handed out as RGBA8; still images come out as a single frame that plays
//! once.

use std::io::Cursor;

use image_webp::{DecodingError, LoopCount, WebPDecoder};
use log::debug;

use tessera_core::slots::ImageBytes;
use tessera_core::traits::{CanvasInfo, Codec, CodecError, DecodedFrame, FrameDecoder};

/// Largest canvas the decoder will open
const MAX_CANVAS_PIXELS: usize = 256 * 256;

fn map_error(e: DecodingError) -> CodecError {
    match e {
        DecodingError::ImageTooLarge | DecodingError::MemoryLimitExceeded => {
            CodecError::OutOfMemory
        }
        other => {
            debug!("WebP decode error: {}", other);
            CodecError::Corrupt
        }
    }
}

/// Codec for WebP images
#[derive(Default)]
pub struct WebpCodec;

impl Codec for WebpCodec {
    type Decoder = WebpDecoder;

    fn open(&mut self, image: ImageBytes) -> Result<WebpDecoder, CodecError> {
        let decoder = WebPDecoder::new(Cursor::new(image.clone())).map_err(|e| match e {
            DecodingError::RiffSignatureInvalid(_) | DecodingError::WebpSignatureInvalid(_) => {
                CodecError::Unsupported
            }
            other => map_error(other),
        })?;

        let (width, height) = decoder.dimensions();
        let pixels = width as usize * height as usize;
        if pixels == 0 || pixels > MAX_CANVAS_PIXELS {
            return Err(CodecError::Unsupported);
        }

        let animated = decoder.is_animated();
        let native_len = decoder
            .output_buffer_size()
            .ok_or(CodecError::OutOfMemory)?;
        let channels = native_len / pixels;
        if channels != 3 && channels != 4 {
            return Err(CodecError::Unsupported);
        }
        let loop_count = if animated {
            match decoder.loop_count() {
                LoopCount::Forever => 0,
                LoopCount::Times(n) => n.get() as u32,
            }
        } else {
            1
        };
        let frame_count = if animated { decoder.num_frames() } else { 1 };

        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(native_len)
            .map_err(|_| CodecError::OutOfMemory)?;
        scratch.resize(native_len, 0);
        let mut rgba = Vec::new();
        rgba.try_reserve_exact(pixels * 4)
            .map_err(|_| CodecError::OutOfMemory)?;
        rgba.resize(pixels * 4, 0);

        Ok(WebpDecoder {
            inner: decoder,
            image,
            info: CanvasInfo {
                width: width as u16,
                height: height as u16,
                loop_count,
                frame_count,
            },
            animated,
            channels,
            scratch,
            rgba,
            next: 0,
            elapsed_ms: 0,
        })
    }
}

/// An open WebP stream
pub struct WebpDecoder {
    inner: WebPDecoder<Cursor<ImageBytes>>,
    /// Kept for re-opening still images
    image: ImageBytes,
    info: CanvasInfo,
    animated: bool,
    channels: usize,
    /// Decoder output in its native layout
    scratch: Vec<u8>,
    /// Frame handed to the executor
    rgba: Vec<u8>,
    next: u32,
    /// End time of the last frame within the loop
    elapsed_ms: u32,
}

impl WebpDecoder {
    fn expand(&mut self) {
        if self.channels == 4 {
            self.rgba.copy_from_slice(&self.scratch);
            return;
        }
        for (dst, src) in self.rgba.chunks_exact_mut(4).zip(self.scratch.chunks_exact(3)) {
            dst[..3].copy_from_slice(src);
            dst[3] = 255;
        }
    }
}

impl FrameDecoder for WebpDecoder {
    fn info(&self) -> CanvasInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame<'_>>, CodecError> {
        if self.next >= self.info.frame_count {
            return Ok(None);
        }

        let duration_ms = if self.animated {
            self.inner.read_frame(&mut self.scratch).map_err(map_error)?
        } else {
            self.inner.read_image(&mut self.scratch).map_err(map_error)?;
            0
        };
        self.expand();

        self.next += 1;
        // Timestamps mark when each frame ends
        self.elapsed_ms = self.elapsed_ms.saturating_add(duration_ms);
        Ok(Some(DecodedFrame {
            pixels: &mut self.rgba,
            timestamp_ms: self.elapsed_ms,
        }))
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        if self.animated {
            self.inner.reset_animation().map_err(map_error)?;
        } else {
            // Still images are decoded again from the start of the stream
            self.inner = WebPDecoder::new(Cursor::new(self.image.clone())).map_err(map_error)?;
        }
        self.next = 0;
        self.elapsed_ms = 0;
        Ok(())
    }
}
