//! Progress preemption
//!
//! While an update is queued or running the main loop replaces normal
//! content with one of five progress images. [`ProgressTracker`] turns a
//! stream of status snapshots into the few moments where the display
//! actually has to change.

use embassy_time::Duration;

use super::status::OtaStatus;
use tessera_protocol::OtaState;

/// How often the main loop re-checks status while preempted
pub const OTA_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Coarse progress buckets, one image each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProgressStage {
    P0,
    P25,
    P50,
    P75,
    P100,
}

impl ProgressStage {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            0..=24 => ProgressStage::P0,
            25..=49 => ProgressStage::P25,
            50..=74 => ProgressStage::P50,
            75..=99 => ProgressStage::P75,
            _ => ProgressStage::P100,
        }
    }

    /// Lower bound of the bucket in percent
    pub fn percent(self) -> u8 {
        match self {
            ProgressStage::P0 => 0,
            ProgressStage::P25 => 25,
            ProgressStage::P50 => 50,
            ProgressStage::P75 => 75,
            ProgressStage::P100 => 100,
        }
    }
}

/// What the main loop should do about the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreemptAction {
    /// Nothing changed
    None,
    /// Show this progress image
    Show(ProgressStage),
    /// Update over; go back to normal content
    Release,
}

/// Tracks which progress image is on screen
#[derive(Debug, Default)]
pub struct ProgressTracker {
    shown: Option<ProgressStage>,
}

impl ProgressTracker {
    pub const fn new() -> Self {
        Self { shown: None }
    }

    /// Whether normal content is currently suspended
    pub fn is_preempting(&self) -> bool {
        self.shown.is_some()
    }

    /// Feed a status snapshot
    ///
    /// `Success` keeps the display preempted at 100% until the restart.
    pub fn update(&mut self, status: OtaStatus) -> PreemptAction {
        let stage = match status.state {
            OtaState::Queued => ProgressStage::P0,
            OtaState::InProgress => ProgressStage::from_percent(status.progress),
            OtaState::Success => ProgressStage::P100,
            OtaState::Idle | OtaState::Failed => {
                return match self.shown.take() {
                    Some(_) => PreemptAction::Release,
                    None => PreemptAction::None,
                };
            }
        };

        if self.shown == Some(stage) {
            PreemptAction::None
        } else {
            self.shown = Some(stage);
            PreemptAction::Show(stage)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: OtaState, progress: u8) -> OtaStatus {
        OtaStatus { state, progress }
    }

    #[test]
    fn test_buckets() {
        assert_eq!(ProgressStage::from_percent(0), ProgressStage::P0);
        assert_eq!(ProgressStage::from_percent(24), ProgressStage::P0);
        assert_eq!(ProgressStage::from_percent(25), ProgressStage::P25);
        assert_eq!(ProgressStage::from_percent(74), ProgressStage::P50);
        assert_eq!(ProgressStage::from_percent(99), ProgressStage::P75);
        assert_eq!(ProgressStage::from_percent(100), ProgressStage::P100);
        assert_eq!(ProgressStage::from_percent(255), ProgressStage::P100);
    }

    #[test]
    fn test_only_stage_changes_redraw() {
        let mut tracker = ProgressTracker::new();

        assert_eq!(
            tracker.update(status(OtaState::Queued, 0)),
            PreemptAction::Show(ProgressStage::P0)
        );
        assert_eq!(tracker.update(status(OtaState::InProgress, 10)), PreemptAction::None);
        assert_eq!(
            tracker.update(status(OtaState::InProgress, 30)),
            PreemptAction::Show(ProgressStage::P25)
        );
        assert_eq!(tracker.update(status(OtaState::InProgress, 45)), PreemptAction::None);
        assert!(tracker.is_preempting());
    }

    #[test]
    fn test_failure_releases() {
        let mut tracker = ProgressTracker::new();
        tracker.update(status(OtaState::InProgress, 60));

        assert_eq!(tracker.update(status(OtaState::Failed, 60)), PreemptAction::Release);
        assert!(!tracker.is_preempting());
        assert_eq!(tracker.update(status(OtaState::Failed, 60)), PreemptAction::None);
    }

    #[test]
    fn test_success_holds_full_bar() {
        let mut tracker = ProgressTracker::new();
        tracker.update(status(OtaState::InProgress, 80));

        assert_eq!(
            tracker.update(status(OtaState::Success, 100)),
            PreemptAction::Show(ProgressStage::P100)
        );
        assert!(tracker.is_preempting());
    }

    #[test]
    fn test_idle_is_quiet() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.update(OtaStatus::IDLE), PreemptAction::None);
    }
}
