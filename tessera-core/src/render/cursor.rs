use embassy_time::{Duration, Instant};

use crate::traits::CanvasInfo;

/// Playback position within one draw command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnimationCursor {
    pub width: u16,
    pub height: u16,
    /// Frames painted in the current loop
    pub frame_index: u32,
    /// Completed loops
    pub loops: u32,
    /// Declared loop limit, 0 = infinite
    pub loop_limit: u32,
    pub last_timestamp_ms: u32,
    started: Instant,
    dwell: Option<Duration>,
}

impl AnimationCursor {
    /// Start a cursor; `dwell_secs` of 0 means no dwell limit
    pub fn new(info: CanvasInfo, started: Instant, dwell_secs: u32) -> Self {
        Self {
            width: info.width,
            height: info.height,
            frame_index: 0,
            loops: 0,
            loop_limit: info.loop_count,
            last_timestamp_ms: 0,
            started,
            dwell: (dwell_secs > 0).then(|| Duration::from_secs(dwell_secs as u64)),
        }
    }

    /// Record a painted frame and return the delay before the next one
    ///
    /// The delay is the timestamp gap to the previous frame, at least 1 ms.
    pub fn advance(&mut self, timestamp_ms: u32) -> Duration {
        let gap = timestamp_ms.saturating_sub(self.last_timestamp_ms).max(1);
        self.last_timestamp_ms = timestamp_ms;
        self.frame_index += 1;
        Duration::from_millis(gap as u64)
    }

    /// Record the end of a loop
    ///
    /// Returns `true` when the loop limit has been reached. Otherwise the
    /// cursor is rewound to the first frame.
    pub fn end_of_loop(&mut self) -> bool {
        self.loops += 1;
        if self.loop_limit > 0 && self.loops >= self.loop_limit {
            return true;
        }
        self.frame_index = 0;
        self.last_timestamp_ms = 0;
        false
    }

    /// Whether the dwell time has run out
    pub fn dwell_expired(&self, now: Instant) -> bool {
        self.dwell
            .is_some_and(|dwell| now.saturating_duration_since(self.started) >= dwell)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
