//! Update apply thread
//!
//! Picks queued requests off the coordinator one at a time and streams
//! them into the spare OTA partition. A verified image restarts the
//! device; anything else leaves the running firmware in place.

use std::thread;
use std::time::Duration;

use esp_idf_svc::hal::reset;
use esp_idf_svc::hal::task::block_on;
use log::{error, info};

use tessera_core::ota::OtaCoordinator;

use crate::channels::DeviceMutex;
use crate::net::{EspFlash, EspHttp};

/// Time the 100% progress image stays up before the restart
const RESTART_DELAY: Duration = Duration::from_millis(500);

/// Apply loop, never returns
pub fn ota_task(
    ota: &'static OtaCoordinator<DeviceMutex>,
    mut client: EspHttp,
    mut flash: EspFlash,
) -> ! {
    info!("OTA task started");

    loop {
        let request = block_on(ota.next_request());
        info!("OTA update to {} from {}", request.version, request.url);

        match ota.run_update(&request, &mut client, &mut flash) {
            Ok(written) => {
                info!("OTA image verified ({} bytes), restarting", written);
                thread::sleep(RESTART_DELAY);
                reset::restart();
            }
            Err(e) => error!("OTA update failed: {}", e),
        }
    }
}
