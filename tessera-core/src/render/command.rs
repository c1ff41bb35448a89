//! Render commands and their queue

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration};

use crate::palette::PaletteMode;
use crate::slots::ImageBytes;

/// Queue depth
pub const QUEUE_DEPTH: usize = 8;

/// How long an async submit waits for room before giving up
pub const SUBMIT_TIMEOUT: Duration = Duration::from_millis(100);

/// Commands consumed by the render executor
#[derive(Debug, Clone)]
pub enum RenderCommand {
    /// Play the given slot; it must be the active slot
    DrawSlot(usize),
    /// Play a transient image (progress frames, diagnostics)
    DrawBuffer(ImageBytes),
    /// Stop playback and blank the panel
    Clear,
    /// Change a slot's palette; applies from the next frame
    SetPalette(usize, PaletteMode),
    /// Set panel brightness in percent
    SetBrightness(u8),
}

impl RenderCommand {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            RenderCommand::DrawSlot(_) => "draw_slot",
            RenderCommand::DrawBuffer(_) => "draw_buffer",
            RenderCommand::Clear => "clear",
            RenderCommand::SetPalette(..) => "set_palette",
            RenderCommand::SetBrightness(_) => "set_brightness",
        }
    }
}

/// Submission errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// The queue stayed full
    Busy,
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CommandError::Busy => write!(f, "render queue busy"),
        }
    }
}

/// Bounded FIFO of render commands
///
/// Any number of producers, exactly one consumer (the executor).
pub struct RenderQueue<M: RawMutex> {
    channel: Channel<M, RenderCommand, QUEUE_DEPTH>,
}

impl<M: RawMutex> RenderQueue<M> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue without waiting
    pub fn try_submit(&self, cmd: RenderCommand) -> Result<(), CommandError> {
        self.channel.try_send(cmd).map_err(|_| CommandError::Busy)
    }

    /// Enqueue, waiting up to [`SUBMIT_TIMEOUT`] for room
    pub async fn submit(&self, cmd: RenderCommand) -> Result<(), CommandError> {
        with_timeout(SUBMIT_TIMEOUT, self.channel.send(cmd))
            .await
            .map_err(|_| CommandError::Busy)
    }

    /// Wait for the next command
    pub async fn receive(&self) -> RenderCommand {
        self.channel.receive().await
    }

    pub fn try_receive(&self) -> Option<RenderCommand> {
        self.channel.try_receive().ok()
    }

    /// Commands waiting
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<M: RawMutex> Default for RenderQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}
