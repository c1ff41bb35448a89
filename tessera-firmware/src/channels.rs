//! Shared services
//!
//! Single-instance state handed to every thread by `'static` reference.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use static_cell::StaticCell;

use tessera_core::ota::OtaCoordinator;
use tessera_core::render::RenderQueue;
use tessera_core::slots::SlotStore;

/// Raw mutex used by every shared service
pub type DeviceMutex = CriticalSectionRawMutex;

/// Commands for the render thread
pub static RENDER_QUEUE: RenderQueue<DeviceMutex> = RenderQueue::new();

/// Image slots, created once the boot image is known
pub static SLOTS: StaticCell<SlotStore<DeviceMutex>> = StaticCell::new();

/// Update coordinator, sized from the device configuration
pub static OTA: StaticCell<OtaCoordinator<DeviceMutex>> = StaticCell::new();
