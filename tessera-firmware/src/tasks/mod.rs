//! Execution contexts
//!
//! Each context is an OS thread. They share the slot store, the render
//! queue and the update coordinator from `channels`; nothing else.

pub mod buttons;
pub mod ota;
pub mod refresh;
pub mod render;

pub use buttons::{button_task, Button};
pub use ota::ota_task;
pub use refresh::{refresh_task, RefreshContext};
pub use render::{render_task, LedMatrix};

use esp_idf_svc::hal::task::block_on;
use log::warn;

use tessera_core::render::RenderCommand;

use crate::channels::RENDER_QUEUE;

/// Queue a render command, waiting briefly for room
pub fn submit(cmd: RenderCommand) {
    let name = cmd.name();
    if let Err(e) = block_on(RENDER_QUEUE.submit(cmd)) {
        warn!("Render command {} dropped: {}", name, e);
    }
}
