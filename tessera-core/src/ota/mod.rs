//! Firmware update lifecycle
//!
//! ```text
//! Idle ──submit──► Queued ──apply loop picks up──► InProgress ──► Success ──► restart
//!                    ▲                                  │
//!                    └──────── next submit ◄── Failed ◄─┘
//! ```
//!
//! Status is a single atomic word readable from any context. The render
//! side polls it and swaps normal content for a progress indicator while an
//! update is queued or running.

mod coordinator;
mod progress;
mod request;
mod status;

pub use coordinator::{OtaCoordinator, OtaError, OTA_CHUNK_SIZE};
pub use progress::{PreemptAction, ProgressStage, ProgressTracker, OTA_POLL_INTERVAL};
pub use request::{RequestError, UpdateRequest};
pub use status::{OtaStatus, StatusCell};
pub use tessera_protocol::OtaState;
