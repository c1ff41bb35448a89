//! OTA partition writer
//!
//! Implements the core `FirmwareSink` over `EspOta`.

use embedded_io::Write;
use esp_idf_svc::ota::{EspOta, EspOtaUpdate};
use log::warn;

use tessera_core::traits::{FirmwareSink, FirmwareUpdate, FlashError};

/// The inactive application partition
pub struct EspFlash {
    ota: EspOta,
}

impl EspFlash {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { ota: EspOta::new()? })
    }
}

/// An update being written
pub struct EspFlashUpdate<'a> {
    update: EspOtaUpdate<'a>,
}

impl FirmwareUpdate for EspFlashUpdate<'_> {
    fn write(&mut self, chunk: &[u8]) -> Result<(), FlashError> {
        self.update.write_all(chunk).map_err(|e| {
            warn!("OTA write failed: {:?}", e);
            FlashError::Write
        })
    }

    fn complete(self) -> Result<(), FlashError> {
        self.update.complete().map_err(|e| {
            warn!("OTA finalize failed: {:?}", e);
            FlashError::Finalize
        })
    }

    fn abort(self) -> Result<(), FlashError> {
        self.update.abort().map_err(|_| FlashError::Finalize)
    }
}

impl FirmwareSink for EspFlash {
    type Update<'a> = EspFlashUpdate<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<EspFlashUpdate<'_>, FlashError> {
        let update = self.ota.initiate_update().map_err(|e| {
            warn!("OTA initiate failed: {:?}", e);
            FlashError::Unavailable
        })?;
        Ok(EspFlashUpdate { update })
    }
}

/// Confirm the running image so the bootloader does not roll back
pub fn mark_running_slot_valid() {
    match EspOta::new() {
        Ok(mut ota) => {
            if let Err(e) = ota.mark_running_slot_valid() {
                warn!("failed to mark running OTA slot valid: {:?}", e);
            }
        }
        Err(e) => warn!("OTA unavailable: {:?}", e),
    }
}
