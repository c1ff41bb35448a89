//! Render thread
//!
//! Owns the LED matrix. Waits on the render queue with the next frame
//! deadline as timeout, so frame timing and command handling share one
//! loop.

use esp_idf_svc::hal::task::block_on;
use log::{debug, info, warn};
use ws2812_esp32_rmt_driver::Ws2812Esp32Rmt;

use tessera_core::render::{FrameOutcome, RenderEvent, RenderExecutor};
use tessera_core::slots::SlotStore;

use crate::channels::{DeviceMutex, RENDER_QUEUE};
use crate::display::{MatrixBus, WebpCodec};

/// The panel as wired on the board
pub type LedMatrix = MatrixBus<Ws2812Esp32Rmt<'static>>;

/// Render loop, never returns
pub fn render_task(slots: &'static SlotStore<DeviceMutex>, bus: LedMatrix) -> ! {
    info!("Render task started");

    let mut executor = RenderExecutor::new(slots, bus, WebpCodec);

    loop {
        match block_on(executor.poll(&RENDER_QUEUE)) {
            RenderEvent::Command { name, result: Ok(()) } => debug!("Render command {} applied", name),
            RenderEvent::Command { name, result: Err(e) } => {
                warn!("Render command {} failed: {}", name, e)
            }
            RenderEvent::Frame(FrameOutcome::Finished { loops }) => {
                debug!("Animation finished after {} loops", loops)
            }
            RenderEvent::Frame(FrameOutcome::DwellExpired) => debug!("Dwell time expired"),
            RenderEvent::Frame(FrameOutcome::Failed(e)) => warn!("Playback stopped: {}", e),
            RenderEvent::Frame(_) => {}
        }
    }
}
