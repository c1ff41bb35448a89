//! In-memory collaborators for unit tests

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::task::Wake;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::task::Waker;

use embedded_io::{ErrorKind, ErrorType, Read};

use crate::slots::ImageBytes;
use crate::traits::{
    BusError, CanvasInfo, Codec, CodecError, DecodedFrame, FirmwareSink, FirmwareUpdate,
    FlashError, FrameDecoder, HttpClient, HttpResponse, PixelBus, TransportError,
};

/// Framebuffer-backed pixel bus
pub struct MockBus {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<[u8; 3]>,
    pub presents: u32,
    pub clears: u32,
    pub brightness: u8,
    pub fail_present: bool,
}

impl MockBus {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 3]; width as usize * height as usize],
            presents: 0,
            clears: 0,
            brightness: 100,
            fail_present: false,
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> [u8; 3] {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

impl PixelBus for MockBus {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn set_pixel(&mut self, x: u16, y: u16, r: u8, g: u8, b: u8) {
        if x < self.width && y < self.height {
            let i = y as usize * self.width as usize + x as usize;
            self.pixels[i] = [r, g, b];
        }
    }

    fn present(&mut self) -> Result<(), BusError> {
        if self.fail_present {
            return Err(BusError::Transfer);
        }
        self.presents += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BusError> {
        self.pixels.iter_mut().for_each(|p| *p = [0; 3]);
        self.clears += 1;
        Ok(())
    }

    fn set_brightness(&mut self, percent: u8) {
        self.brightness = percent;
    }
}

/// Build a fake 2×2 animation inside a WebP envelope
///
/// Every frame paints pixels 0-2 with `[color, frame, 0]`; pixel 3 is
/// fully transparent. Frames last `delay_10ms * 10` ms. A non-zero
/// `fail_at` makes decoding of that (1-based) frame fail.
pub fn fake_image(frames: u8, loops: u8, delay_10ms: u8, color: u8, fail_at: u8) -> Vec<u8> {
    let mut bytes = Vec::from(&b"RIFF\x00\x00\x00\x00WEBP"[..]);
    bytes.extend_from_slice(&[frames, loops, delay_10ms, color, fail_at]);
    bytes
}

/// Codec for [`fake_image`] payloads
#[derive(Default)]
pub struct MockCodec {
    pub opened: u32,
}

pub struct MockDecoder {
    image: ImageBytes,
    next: u8,
    pixels: Vec<u8>,
}

impl MockDecoder {
    fn field(&self, i: usize) -> u8 {
        self.image[12 + i]
    }
}

impl Codec for MockCodec {
    type Decoder = MockDecoder;

    fn open(&mut self, image: ImageBytes) -> Result<MockDecoder, CodecError> {
        if image.len() < 17 || image[12] == 0 {
            return Err(CodecError::Unsupported);
        }
        self.opened += 1;
        Ok(MockDecoder {
            image,
            next: 0,
            pixels: vec![0; 16],
        })
    }
}

impl FrameDecoder for MockDecoder {
    fn info(&self) -> CanvasInfo {
        CanvasInfo {
            width: 2,
            height: 2,
            loop_count: self.field(1) as u32,
            frame_count: self.field(0) as u32,
        }
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame<'_>>, CodecError> {
        if self.next >= self.field(0) {
            return Ok(None);
        }
        if self.field(4) != 0 && self.next + 1 == self.field(4) {
            return Err(CodecError::Corrupt);
        }

        let frame = self.next;
        let color = self.field(3);
        for px in self.pixels.chunks_exact_mut(4).take(3) {
            px.copy_from_slice(&[color, frame, 0, 255]);
        }
        self.pixels[12..16].copy_from_slice(&[255, 255, 255, 0]);
        self.next += 1;

        let timestamp_ms = self.next as u32 * self.field(2) as u32 * 10;
        Ok(Some(DecodedFrame {
            pixels: &mut self.pixels,
            timestamp_ms,
        }))
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        self.next = 0;
        Ok(())
    }
}

/// Canned HTTP server
pub struct MockHttp {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    /// Largest read handed out at once
    pub chunk: usize,
    /// Reads fail once this many bytes have been served
    pub fail_read_at: Option<usize>,
    pub connect_error: Option<TransportError>,
    pub requests: u32,
}

impl MockHttp {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
            chunk: 1000,
            fail_read_at: None,
            connect_error: None,
            requests: 0,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl ToString) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    /// Declare the body length
    pub fn with_length(self) -> Self {
        let len = self.body.len();
        self.header("Content-Length", len)
    }
}

pub struct MockResponse<'a> {
    server: &'a MockHttp,
    pos: usize,
}

impl ErrorType for MockResponse<'_> {
    type Error = ErrorKind;
}

impl Read for MockResponse<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if self.server.fail_read_at.is_some_and(|at| self.pos >= at) {
            return Err(ErrorKind::ConnectionReset);
        }
        let remaining = &self.server.body[self.pos..];
        let n = remaining.len().min(buf.len()).min(self.server.chunk);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl HttpResponse for MockResponse<'_> {
    fn status(&self) -> u16 {
        self.server.status
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.server
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl HttpClient for MockHttp {
    type Response<'a> = MockResponse<'a>
    where
        Self: 'a;

    fn get<'a>(&'a mut self, _url: &str) -> Result<MockResponse<'a>, TransportError> {
        self.requests += 1;
        if let Some(e) = self.connect_error {
            return Err(e);
        }
        Ok(MockResponse {
            server: self,
            pos: 0,
        })
    }
}

/// Flash writer that records what it was given
#[derive(Default)]
pub struct MockFlash {
    pub written: Vec<u8>,
    pub begun: u32,
    pub completed: bool,
    pub aborted: bool,
    pub fail_write: bool,
}

pub struct MockUpdate<'a> {
    flash: &'a mut MockFlash,
}

impl FirmwareUpdate for MockUpdate<'_> {
    fn write(&mut self, chunk: &[u8]) -> Result<(), FlashError> {
        if self.flash.fail_write {
            return Err(FlashError::Write);
        }
        self.flash.written.extend_from_slice(chunk);
        Ok(())
    }

    fn complete(self) -> Result<(), FlashError> {
        self.flash.completed = true;
        Ok(())
    }

    fn abort(self) -> Result<(), FlashError> {
        self.flash.aborted = true;
        Ok(())
    }
}

impl FirmwareSink for MockFlash {
    type Update<'a> = MockUpdate<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<MockUpdate<'_>, FlashError> {
        self.begun += 1;
        self.written.clear();
        Ok(MockUpdate { flash: self })
    }
}

/// Waker that only counts how often it was woken
///
/// Lets a test poll a future by hand and check that it stays pending
/// until something actually wakes it.
#[derive(Default)]
pub struct CountingWaker {
    wakes: AtomicUsize,
}

impl CountingWaker {
    pub fn new() -> (Arc<Self>, Waker) {
        let counter = Arc::new(Self::default());
        let waker = Waker::from(counter.clone());
        (counter, waker)
    }

    pub fn wakes(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl Wake for CountingWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}
