//! Render pipeline
//!
//! A bounded command queue feeding a single executor that owns the pixel
//! bus. The executor's only suspension point is a timed wait on the queue,
//! with the deadline set by the next animation frame.

mod command;
mod cursor;
mod executor;

pub use command::{CommandError, RenderCommand, RenderQueue, QUEUE_DEPTH, SUBMIT_TIMEOUT};
pub use cursor::AnimationCursor;
pub use executor::{FrameOutcome, PlaybackState, RenderError, RenderEvent, RenderExecutor};
