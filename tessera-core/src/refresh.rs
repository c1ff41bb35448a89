//! Refresh scheduling
//!
//! Decides when the next fetch happens and installs fetched content into
//! the slot store.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;

use crate::fetch::{FetchError, FetchResult};
use crate::slots::{SlotError, SlotStore};

/// Shortest time between two fetches
pub const MIN_REFRESH: Duration = Duration::from_secs(2);

/// Longest wait after repeated failures
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Refresh planner
///
/// Tracks consecutive failures and turns fetch outcomes into the delay
/// before the next attempt.
#[derive(Debug, Clone)]
pub struct RefreshPlanner {
    min_refresh: Duration,
    max_backoff: Duration,
    /// Consecutive failures since the last success
    failures: u32,
}

impl Default for RefreshPlanner {
    fn default() -> Self {
        Self::new(MIN_REFRESH, MAX_BACKOFF)
    }
}

impl RefreshPlanner {
    pub fn new(min_refresh: Duration, max_backoff: Duration) -> Self {
        Self {
            min_refresh,
            max_backoff: max_backoff.max(min_refresh),
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay after a successful fetch
    pub fn on_success(&mut self, dwell_secs: u32) -> Duration {
        self.failures = 0;
        Duration::from_secs(dwell_secs as u64).max(self.min_refresh)
    }

    /// Delay after a failed fetch
    ///
    /// Starts at the minimum refresh interval and doubles up to the cap.
    pub fn on_failure(&mut self) -> Duration {
        let shift = self.failures.min(16);
        self.failures = self.failures.saturating_add(1);

        let ticks = self.min_refresh.as_ticks().saturating_mul(1 << shift);
        Duration::from_ticks(ticks).min(self.max_backoff)
    }

    /// Plan the next fetch from an outcome
    pub fn next_delay(&mut self, outcome: &Result<FetchResult, FetchError>) -> Duration {
        match outcome {
            Ok(result) => self.on_success(result.dwell_secs),
            Err(_) => self.on_failure(),
        }
    }
}

/// Copy a fetched image into the spare slot and make it active
///
/// Returns the newly active slot index. On failure the active slot is
/// unchanged.
pub fn install<M: RawMutex>(slots: &SlotStore<M>, result: &FetchResult) -> Result<usize, SlotError> {
    let index = slots.spare_slot().ok_or(SlotError::InvalidTarget)?;
    slots.write_slot(index, result.buffer.as_slice(), result.meta())?;
    slots.activate(index)?;
    Ok(index)
}
