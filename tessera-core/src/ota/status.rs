use portable_atomic::{AtomicU16, Ordering};
use tessera_protocol::{OtaState, StatusReport};

/// Snapshot of the update lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OtaStatus {
    pub state: OtaState,
    /// Percent complete, meaningful while `InProgress`
    pub progress: u8,
}

impl OtaStatus {
    pub const IDLE: OtaStatus = OtaStatus {
        state: OtaState::Idle,
        progress: 0,
    };

    pub fn report(&self) -> StatusReport {
        StatusReport {
            status: self.state,
            progress: self.progress,
        }
    }
}

// Packed as [state:8][progress:8]
fn pack(state: OtaState, progress: u8) -> u16 {
    let code: u8 = match state {
        OtaState::Idle => 0,
        OtaState::Queued => 1,
        OtaState::InProgress => 2,
        OtaState::Success => 3,
        OtaState::Failed => 4,
    };
    (code as u16) << 8 | progress as u16
}

fn unpack(word: u16) -> OtaStatus {
    let state = match word >> 8 {
        1 => OtaState::Queued,
        2 => OtaState::InProgress,
        3 => OtaState::Success,
        4 => OtaState::Failed,
        _ => OtaState::Idle,
    };
    OtaStatus {
        state,
        progress: (word & 0xFF) as u8,
    }
}

/// Lock-free OTA status
///
/// State and progress live in one atomic word so readers never see a torn
/// pair. Every transition is a compare-and-swap from the states it is
/// allowed to leave.
pub struct StatusCell {
    word: AtomicU16,
}

impl StatusCell {
    pub const fn new() -> Self {
        Self {
            word: AtomicU16::new(0),
        }
    }

    pub fn load(&self) -> OtaStatus {
        unpack(self.word.load(Ordering::Acquire))
    }

    fn transition(&self, to: impl Fn(OtaStatus) -> Option<OtaStatus>) -> Result<OtaStatus, OtaStatus> {
        self.word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                to(unpack(word)).map(|next| pack(next.state, next.progress))
            })
            .map(unpack)
            .map_err(unpack)
    }

    /// Idle/Success/Failed → Queued. Returns the previous status.
    pub fn try_queue(&self) -> Result<OtaStatus, OtaStatus> {
        self.transition(|cur| {
            (!cur.state.is_busy()).then_some(OtaStatus {
                state: OtaState::Queued,
                progress: 0,
            })
        })
    }

    /// Undo a `try_queue` that could not be followed through
    pub fn restore(&self, previous: OtaStatus) {
        let _ = self.transition(|cur| (cur.state == OtaState::Queued).then_some(previous));
    }

    /// Queued → InProgress at 0%
    pub fn begin(&self) -> bool {
        self.transition(|cur| {
            (cur.state == OtaState::Queued).then_some(OtaStatus {
                state: OtaState::InProgress,
                progress: 0,
            })
        })
        .is_ok()
    }

    /// Raise progress while InProgress
    ///
    /// Values are clamped to 100 and never lower the stored percent.
    /// Returns the new percent when it changed.
    pub fn report_progress(&self, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        self.transition(|cur| {
            (cur.state == OtaState::InProgress && percent > cur.progress).then_some(OtaStatus {
                state: OtaState::InProgress,
                progress: percent,
            })
        })
        .ok()
        .map(|_| percent)
    }

    /// InProgress → Success (100%) or Failed (progress kept)
    pub fn finish(&self, success: bool) -> bool {
        self.transition(|cur| {
            (cur.state == OtaState::InProgress).then_some(if success {
                OtaStatus {
                    state: OtaState::Success,
                    progress: 100,
                }
            } else {
                OtaStatus {
                    state: OtaState::Failed,
                    progress: cur.progress,
                }
            })
        })
        .is_ok()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
