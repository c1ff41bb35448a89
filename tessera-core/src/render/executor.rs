//! Render executor
//!
//! Owns the pixel bus and the codec. Commands arrive through
//! [`RenderExecutor::handle`]; frames are produced by
//! [`RenderExecutor::tick`] once the deadline from
//! [`RenderExecutor::next_deadline`] has passed.
//!
//! ```text
//!   Idle ──DrawSlot/DrawBuffer──► Decoding ──ok──► Playing ──tick──► Playing
//!    ▲                               │                 │
//!    └──────────── open failed ──────┘                 │
//!    └──── Clear / loop limit / dwell / decode error ──┘
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{with_deadline, Duration, Instant};

use super::command::{RenderCommand, RenderQueue};
use super::cursor::AnimationCursor;
use crate::error::{Classify, ErrorClass};
use crate::palette::{self, PaletteMode};
use crate::slots::{ImageBytes, SlotError, SlotStore};
use crate::traits::{BusError, Codec, CodecError, DecodedFrame, FrameDecoder, PixelBus};

/// Render errors
///
/// None of these are fatal; the executor drops back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderError {
    /// `DrawSlot` named a slot that is not active
    InactiveSlot(usize),
    /// Slot store rejected the operation
    Slot(SlotError),
    /// Codec failed to open or decode
    Codec(CodecError),
    /// Pixel bus transfer failed
    Bus(BusError),
}

impl core::fmt::Display for RenderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RenderError::InactiveSlot(i) => write!(f, "slot {} is not active", i),
            RenderError::Slot(e) => write!(f, "slot: {}", e),
            RenderError::Codec(e) => write!(f, "codec: {}", e),
            RenderError::Bus(e) => write!(f, "pixel bus: {:?}", e),
        }
    }
}

impl Classify for RenderError {
    fn class(&self) -> ErrorClass {
        match self {
            RenderError::InactiveSlot(_) => ErrorClass::Malformed,
            RenderError::Slot(e) => e.class(),
            RenderError::Codec(e) => e.class(),
            RenderError::Bus(_) => ErrorClass::Transient,
        }
    }
}

impl From<SlotError> for RenderError {
    fn from(e: SlotError) -> Self {
        RenderError::Slot(e)
    }
}

impl From<CodecError> for RenderError {
    fn from(e: CodecError) -> Self {
        RenderError::Codec(e)
    }
}

impl From<BusError> for RenderError {
    fn from(e: BusError) -> Self {
        RenderError::Bus(e)
    }
}

/// Coarse executor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Result of a [`RenderExecutor::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameOutcome {
    /// Nothing playing
    Idle,
    /// Deadline not reached yet
    Pending,
    /// A frame went to the panel
    Painted { frame: u32, delay: Duration },
    /// Loop limit reached, last frame stays up
    Finished { loops: u32 },
    /// Dwell time ran out, last frame stays up
    DwellExpired,
    /// Playback torn down after an error
    Failed(RenderError),
}

/// What one pass of the executor loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderEvent {
    /// A command was handled
    Command {
        name: &'static str,
        result: Result<(), RenderError>,
    },
    /// The frame deadline passed
    Frame(FrameOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Slot(usize),
    Buffer,
}

struct Playback<D> {
    decoder: D,
    cursor: AnimationCursor,
    source: Source,
    next_due: Instant,
}

/// Single-consumer render loop state
pub struct RenderExecutor<'a, M: RawMutex, P: PixelBus, C: Codec> {
    slots: &'a SlotStore<M>,
    bus: P,
    codec: C,
    playback: Option<Playback<C::Decoder>>,
}

impl<'a, M: RawMutex, P: PixelBus, C: Codec> RenderExecutor<'a, M, P, C> {
    pub fn new(slots: &'a SlotStore<M>, bus: P, codec: C) -> Self {
        Self {
            slots,
            bus,
            codec,
            playback: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.playback.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    /// Current cursor, while playing
    pub fn cursor(&self) -> Option<&AnimationCursor> {
        self.playback.as_ref().map(|pb| &pb.cursor)
    }

    /// When the next frame is due, `None` while idle
    pub fn next_deadline(&self) -> Option<Instant> {
        self.playback.as_ref().map(|pb| pb.next_due)
    }

    pub fn bus(&self) -> &P {
        &self.bus
    }

    /// Apply one command
    ///
    /// A draw command replaces whatever was playing. The one exception is
    /// a `DrawSlot` for a slot that is not active: it is refused and the
    /// current playback continues. A `DrawBuffer` that fails to open also
    /// blanks the panel; a failed `DrawSlot` leaves the last frame up.
    pub fn handle(&mut self, cmd: RenderCommand, now: Instant) -> Result<(), RenderError> {
        match cmd {
            RenderCommand::DrawSlot(index) => {
                let snapshot = self.slots.read_active();
                if snapshot.index != index {
                    return Err(RenderError::InactiveSlot(index));
                }
                self.start(snapshot.image, Source::Slot(index), snapshot.meta.dwell_secs, now)
            }
            RenderCommand::DrawBuffer(image) => {
                let result = self.start(image, Source::Buffer, 0, now);
                if result.is_err() {
                    // An unreadable transient image blanks the panel; the
                    // open error is what gets reported
                    self.bus.clear().ok();
                }
                result
            }
            RenderCommand::Clear => {
                self.playback = None;
                self.bus.clear()?;
                Ok(())
            }
            RenderCommand::SetPalette(slot, mode) => {
                self.slots.set_palette(slot, mode)?;
                Ok(())
            }
            RenderCommand::SetBrightness(percent) => {
                self.bus.set_brightness(percent.min(100));
                Ok(())
            }
        }
    }

    fn start(
        &mut self,
        image: ImageBytes,
        source: Source,
        dwell_secs: u32,
        now: Instant,
    ) -> Result<(), RenderError> {
        // Supersede first so a failed open leaves us idle
        self.playback = None;

        let decoder = self.codec.open(image)?;
        let cursor = AnimationCursor::new(decoder.info(), now, dwell_secs);
        self.playback = Some(Playback {
            decoder,
            cursor,
            source,
            next_due: now,
        });
        Ok(())
    }

    /// Produce the next frame if it is due
    pub fn tick(&mut self, now: Instant) -> FrameOutcome {
        let Some(pb) = self.playback.as_mut() else {
            return FrameOutcome::Idle;
        };
        if now < pb.next_due {
            return FrameOutcome::Pending;
        }
        if pb.cursor.dwell_expired(now) {
            self.playback = None;
            return FrameOutcome::DwellExpired;
        }

        // Palette is re-read every frame so SetPalette lands on the next one
        let palette = match pb.source {
            Source::Slot(index) => self
                .slots
                .metadata(index)
                .map(|meta| meta.palette)
                .unwrap_or_default(),
            Source::Buffer => PaletteMode::Normal,
        };

        let outcome = step(pb, &mut self.bus, palette, now);
        if !matches!(outcome, FrameOutcome::Painted { .. }) {
            self.playback = None;
        }
        outcome
    }

    /// Wait for either the next command or the next frame deadline
    pub async fn poll<QM: RawMutex>(&mut self, queue: &RenderQueue<QM>) -> RenderEvent {
        let cmd = match self.next_deadline() {
            Some(at) => with_deadline(at, queue.receive()).await.ok(),
            None => Some(queue.receive().await),
        };

        match cmd {
            Some(cmd) => {
                let name = cmd.name();
                let result = self.handle(cmd, Instant::now());
                RenderEvent::Command { name, result }
            }
            None => RenderEvent::Frame(self.tick(Instant::now())),
        }
    }
}

/// Decode and paint one frame, rewinding once at the end of a loop
fn step<D: FrameDecoder, P: PixelBus>(
    pb: &mut Playback<D>,
    bus: &mut P,
    palette: PaletteMode,
    now: Instant,
) -> FrameOutcome {
    match pb.decoder.next_frame() {
        Ok(Some(frame)) => return paint_and_schedule(frame, &mut pb.cursor, &mut pb.next_due, bus, palette, now),
        Ok(None) => {}
        Err(e) => return FrameOutcome::Failed(e.into()),
    }

    if pb.cursor.end_of_loop() {
        return FrameOutcome::Finished {
            loops: pb.cursor.loops,
        };
    }
    if let Err(e) = pb.decoder.reset() {
        return FrameOutcome::Failed(e.into());
    }

    match pb.decoder.next_frame() {
        Ok(Some(frame)) => paint_and_schedule(frame, &mut pb.cursor, &mut pb.next_due, bus, palette, now),
        // A sequence with no frames at all
        Ok(None) => FrameOutcome::Failed(RenderError::Codec(CodecError::Corrupt)),
        Err(e) => FrameOutcome::Failed(e.into()),
    }
}

fn paint_and_schedule<P: PixelBus>(
    frame: DecodedFrame<'_>,
    cursor: &mut AnimationCursor,
    next_due: &mut Instant,
    bus: &mut P,
    palette: PaletteMode,
    now: Instant,
) -> FrameOutcome {
    if let Err(e) = paint(bus, frame.pixels, cursor, palette) {
        return FrameOutcome::Failed(e.into());
    }
    let delay = cursor.advance(frame.timestamp_ms);
    *next_due = now + delay;
    FrameOutcome::Painted {
        frame: cursor.frame_index,
        delay,
    }
}

fn paint<P: PixelBus>(
    bus: &mut P,
    pixels: &mut [u8],
    cursor: &AnimationCursor,
    palette: PaletteMode,
) -> Result<(), BusError> {
    let width = cursor.width as usize;
    if width == 0 {
        return bus.present();
    }
    if !palette.is_identity() {
        palette::apply(pixels, width, cursor.height as usize, palette.matrix());
    }

    for (i, px) in pixels.chunks_exact(4).take(cursor.pixel_count()).enumerate() {
        // Fully transparent pixels keep whatever is already on the panel
        if px[3] == 0 {
            continue;
        }
        bus.set_pixel((i % width) as u16, (i / width) as u16, px[0], px[1], px[2]);
    }
    bus.present()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{MetaUpdate, BOOT_SLOT};
    use crate::testing::{fake_image, CountingWaker, MockBus, MockCodec};
    use alloc::boxed::Box;
    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, Poll};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type Store = SlotStore<CriticalSectionRawMutex>;

    fn boot_store() -> &'static Store {
        let boot: &'static [u8] = Box::leak(fake_image(2, 0, 10, 200, 0).into_boxed_slice());
        Box::leak(Box::new(SlotStore::new(boot)))
    }

    fn executor(store: &Store) -> RenderExecutor<'_, CriticalSectionRawMutex, MockBus, MockCodec> {
        RenderExecutor::new(store, MockBus::new(2, 2), MockCodec::default())
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_draw_paints_first_frame_immediately() {
        let store = boot_store();
        let mut exec = executor(store);

        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();
        assert_eq!(exec.state(), PlaybackState::Playing);
        assert_eq!(exec.next_deadline(), Some(at(0)));

        let outcome = exec.tick(at(0));
        assert_eq!(
            outcome,
            FrameOutcome::Painted {
                frame: 1,
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(exec.bus().pixel(0, 0), [200, 0, 0]);
        assert_eq!(exec.bus().presents, 1);
        assert_eq!(exec.next_deadline(), Some(at(100)));
    }

    #[test]
    fn test_transparent_pixels_skipped() {
        let store = boot_store();
        let mut exec = executor(store);

        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();
        exec.tick(at(0));

        assert_eq!(exec.bus().pixel(1, 1), [0, 0, 0]);
        assert_eq!(exec.bus().pixel(1, 0), [200, 0, 0]);
    }

    #[test]
    fn test_not_due_yet() {
        let store = boot_store();
        let mut exec = executor(store);

        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();
        exec.tick(at(0));
        assert_eq!(exec.tick(at(50)), FrameOutcome::Pending);
        assert_eq!(exec.bus().presents, 1);
    }

    #[test]
    fn test_infinite_loop_rewinds() {
        let store = boot_store();
        let mut exec = executor(store);
        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();

        let mut now = 0;
        for _ in 0..6 {
            match exec.tick(at(now)) {
                FrameOutcome::Painted { delay, .. } => now += delay.as_millis(),
                other => panic!("unexpected {:?}", other),
            }
        }

        let cursor = exec.cursor().unwrap();
        assert_eq!(cursor.loops, 2);
        assert_eq!(exec.bus().presents, 6);
    }

    #[test]
    fn test_finite_loop_finishes() {
        let store = boot_store();
        let img = fake_image(2, 1, 5, 10, 0);
        store.write_slot(1, &img, MetaUpdate::default()).unwrap();
        store.activate(1).unwrap();

        let mut exec = executor(store);
        exec.handle(RenderCommand::DrawSlot(1), at(0)).unwrap();

        assert!(matches!(exec.tick(at(0)), FrameOutcome::Painted { frame: 1, .. }));
        assert!(matches!(exec.tick(at(50)), FrameOutcome::Painted { frame: 2, .. }));
        assert_eq!(exec.tick(at(100)), FrameOutcome::Finished { loops: 1 });
        assert_eq!(exec.state(), PlaybackState::Idle);
        assert_eq!(exec.tick(at(200)), FrameOutcome::Idle);

        // Last frame stays on the panel
        assert_eq!(exec.bus().pixel(0, 0), [10, 1, 0]);
    }

    #[test]
    fn test_inactive_slot_rejected_playback_continues() {
        let store = boot_store();
        store
            .write_slot(2, &fake_image(1, 0, 1, 1, 0), MetaUpdate::default())
            .unwrap();
        let mut exec = executor(store);
        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();

        assert_eq!(
            exec.handle(RenderCommand::DrawSlot(2), at(0)),
            Err(RenderError::InactiveSlot(2))
        );
        assert_eq!(exec.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_buffer_open_failure_blanks_panel() {
        let store = boot_store();
        let mut exec = executor(store);
        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();

        let garbage = ImageBytes::Static(b"RIFF\x00\x00\x00\x00WEBP");
        assert_eq!(
            exec.handle(RenderCommand::DrawBuffer(garbage), at(0)),
            Err(RenderError::Codec(CodecError::Unsupported))
        );
        assert_eq!(exec.state(), PlaybackState::Idle);
        assert_eq!(exec.bus().presents, 0);
        assert_eq!(exec.bus().clears, 1);
    }

    #[test]
    fn test_slot_open_failure_keeps_panel() {
        let store = boot_store();
        store
            .write_slot(1, b"RIFF\x00\x00\x00\x00WEBP", MetaUpdate::default())
            .unwrap();
        store.activate(1).unwrap();
        let mut exec = executor(store);

        assert_eq!(
            exec.handle(RenderCommand::DrawSlot(1), at(0)),
            Err(RenderError::Codec(CodecError::Unsupported))
        );
        assert_eq!(exec.state(), PlaybackState::Idle);
        assert_eq!(exec.bus().clears, 0);
    }

    #[test]
    fn test_mid_stream_failure_tears_down() {
        let store = boot_store();
        let mut exec = executor(store);
        let img: &'static [u8] = Box::leak(fake_image(3, 0, 1, 9, 2).into_boxed_slice());

        exec.handle(RenderCommand::DrawBuffer(img.into()), at(0)).unwrap();
        assert!(matches!(exec.tick(at(0)), FrameOutcome::Painted { .. }));
        assert_eq!(
            exec.tick(at(10)),
            FrameOutcome::Failed(RenderError::Codec(CodecError::Corrupt))
        );
        assert_eq!(exec.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_palette_applies_from_next_frame() {
        let store = boot_store();
        let mut exec = executor(store);
        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();
        exec.tick(at(0));

        exec.handle(RenderCommand::SetPalette(BOOT_SLOT, PaletteMode::Dimmed), at(10))
            .unwrap();
        // Current frame untouched
        assert_eq!(exec.bus().pixel(0, 0), [200, 0, 0]);

        exec.tick(at(100));
        assert_eq!(exec.bus().pixel(0, 0), [50, 0, 0]);
        assert_eq!(store.metadata(BOOT_SLOT).unwrap().palette, PaletteMode::Dimmed);
    }

    #[test]
    fn test_clear_blanks_and_idles() {
        let store = boot_store();
        let mut exec = executor(store);
        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();
        exec.tick(at(0));

        exec.handle(RenderCommand::Clear, at(5)).unwrap();
        assert_eq!(exec.state(), PlaybackState::Idle);
        assert_eq!(exec.bus().pixel(0, 0), [0, 0, 0]);
        assert_eq!(exec.bus().clears, 1);
    }

    #[test]
    fn test_dwell_expiry() {
        let store = boot_store();
        store
            .write_slot(1, &fake_image(1, 0, 100, 3, 0), MetaUpdate::new(2, PaletteMode::Normal))
            .unwrap();
        store.activate(1).unwrap();

        let mut exec = executor(store);
        exec.handle(RenderCommand::DrawSlot(1), at(0)).unwrap();

        let mut now = 0;
        loop {
            match exec.tick(at(now)) {
                FrameOutcome::Painted { delay, .. } => now += delay.as_millis(),
                FrameOutcome::DwellExpired => break,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(now >= 2_000);
        assert_eq!(exec.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_bus_failure_is_not_fatal() {
        let store = boot_store();
        let mut exec = executor(store);
        exec.bus.fail_present = true;

        exec.handle(RenderCommand::DrawSlot(BOOT_SLOT), at(0)).unwrap();
        assert_eq!(
            exec.tick(at(0)),
            FrameOutcome::Failed(RenderError::Bus(BusError::Transfer))
        );
        assert_eq!(exec.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_brightness_clamped() {
        let store = boot_store();
        let mut exec = executor(store);
        exec.handle(RenderCommand::SetBrightness(180), at(0)).unwrap();
        assert_eq!(exec.bus().brightness, 100);
    }

    #[test]
    fn test_poll_prefers_queued_command() {
        let store = boot_store();
        let queue: RenderQueue<CriticalSectionRawMutex> = RenderQueue::new();
        let mut exec = executor(store);

        queue.try_submit(RenderCommand::DrawSlot(BOOT_SLOT)).unwrap();
        let event = block_on(exec.poll(&queue));
        assert_eq!(
            event,
            RenderEvent::Command {
                name: "draw_slot",
                result: Ok(())
            }
        );

        // Deadline is "now", nothing queued: a frame comes out
        let event = block_on(exec.poll(&queue));
        assert!(matches!(event, RenderEvent::Frame(FrameOutcome::Painted { .. })));
    }

    #[test]
    fn test_idle_poll_sleeps_until_command() {
        let store = boot_store();
        let queue: RenderQueue<CriticalSectionRawMutex> = RenderQueue::new();
        let mut exec = executor(store);
        let (counter, waker) = CountingWaker::new();
        let mut cx = Context::from_waker(&waker);

        let mut wait = pin!(exec.poll(&queue));
        assert!(wait.as_mut().poll(&mut cx).is_pending());
        // A spurious re-poll must not busy-loop on a wake of its own
        assert!(wait.as_mut().poll(&mut cx).is_pending());
        assert_eq!(counter.wakes(), 0);

        queue.try_submit(RenderCommand::Clear).unwrap();
        assert!(counter.wakes() >= 1);
        assert_eq!(
            wait.as_mut().poll(&mut cx),
            Poll::Ready(RenderEvent::Command {
                name: "clear",
                result: Ok(())
            })
        );
    }
}
