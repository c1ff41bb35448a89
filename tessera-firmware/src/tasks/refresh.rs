//! Content refresh loop
//!
//! Runs on the main thread. Between fetches it waits on the update
//! coordinator, bounded by the status poll interval, and swaps content for
//! progress images while an update is queued or running.

use std::sync::{Arc, Mutex, PoisonError};

use esp_idf_svc::hal::task::block_on;
use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use tessera_core::config::DeviceConfig;
use tessera_core::error::Classify;
use tessera_core::fetch::{FetchResult, RemoteFetcher};
use tessera_core::input::ButtonMapper;
use tessera_core::ota::{OtaCoordinator, PreemptAction, ProgressTracker};
use tessera_core::refresh::{self, RefreshPlanner};
use tessera_core::render::RenderCommand;
use tessera_core::slots::SlotStore;

use super::submit;
use crate::assets;
use crate::channels::DeviceMutex;
use crate::net::EspHttp;

/// Everything the refresh loop needs
pub struct RefreshContext {
    pub slots: &'static SlotStore<DeviceMutex>,
    pub ota: &'static OtaCoordinator<DeviceMutex>,
    pub mapper: Arc<Mutex<ButtonMapper>>,
    pub client: EspHttp,
}

/// Refresh loop, never returns
pub fn refresh_task(ctx: RefreshContext, config: &DeviceConfig) -> ! {
    let RefreshContext {
        slots,
        ota,
        mapper,
        mut client,
    } = ctx;

    let url = config.remote.url.as_str();
    let defaults = config.display_defaults();
    let fetcher = RemoteFetcher::new(config.remote.limits());
    let mut planner = RefreshPlanner::new(config.remote.min_refresh(), config.remote.max_backoff());
    let mut tracker = ProgressTracker::new();
    let poll_interval = config.ota.poll_interval();

    info!("Refresh loop started, polling {}", url);

    let mut next_fetch = Instant::now();
    loop {
        match tracker.update(ota.status()) {
            PreemptAction::Show(stage) => {
                info!("OTA progress {}%", stage.percent());
                submit(RenderCommand::DrawBuffer(assets::progress_image(stage)));
            }
            PreemptAction::Release => {
                info!("OTA finished, resuming content");
                submit(RenderCommand::DrawSlot(slots.active_index()));
                next_fetch = Instant::now();
            }
            PreemptAction::None => {}
        }

        if !tracker.is_preempting() && Instant::now() >= next_fetch {
            // Without a brightness header the panel stays at the last applied level
            let brightness = mapper.lock().unwrap_or_else(PoisonError::into_inner).brightness();
            let outcome = fetcher.fetch(&mut client, url, defaults.with_brightness(brightness));
            let delay = planner.next_delay(&outcome);
            match outcome {
                Ok(result) => show(slots, &mapper, &result),
                Err(e) if e.is_transient() => {
                    debug!("Fetch failed ({}), retry #{} in {}s", e, planner.failures(), delay.as_secs())
                }
                Err(e) => warn!("Fetch failed ({}), retry #{} in {}s", e, planner.failures(), delay.as_secs()),
            }
            next_fetch = Instant::now() + delay;
        }

        let wait = if tracker.is_preempting() {
            poll_interval
        } else {
            next_fetch
                .saturating_duration_since(Instant::now())
                .min(poll_interval)
                .max(Duration::from_millis(1))
        };
        block_on(ota.wait_for_change(wait));
    }
}

/// Apply a fetch's brightness and put its image on screen
///
/// A zero brightness directive blanks the panel, so drawing is skipped.
fn show(slots: &SlotStore<DeviceMutex>, mapper: &Mutex<ButtonMapper>, result: &FetchResult) {
    mapper
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .set_brightness(result.brightness);
    submit(RenderCommand::SetBrightness(result.brightness));

    if result.is_empty() || result.brightness == 0 {
        info!(
            "Skipping draw of {} byte image at brightness {}",
            result.len(),
            result.brightness
        );
        return;
    }

    match refresh::install(slots, result) {
        Ok(index) => {
            info!(
                "Slot {} <- {} bytes, dwell={}s palette={}",
                index,
                result.len(),
                result.dwell_secs,
                result.palette.name()
            );
            submit(RenderCommand::DrawSlot(index));
        }
        Err(e) => warn!("Could not install fetched image: {}", e),
    }
}
