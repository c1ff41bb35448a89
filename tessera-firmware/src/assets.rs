//! Built-in images
//!
//! Rendered by the build script for the configured matrix size.

use tessera_core::ota::ProgressStage;
use tessera_core::slots::ImageBytes;

pub static BOOT_IMAGE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/boot.webp"));

static PROGRESS_0: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/progress_0.webp"));
static PROGRESS_25: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/progress_25.webp"));
static PROGRESS_50: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/progress_50.webp"));
static PROGRESS_75: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/progress_75.webp"));
static PROGRESS_100: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/progress_100.webp"));

/// Progress indicator for an update stage
pub fn progress_image(stage: ProgressStage) -> ImageBytes {
    let bytes = match stage {
        ProgressStage::P0 => PROGRESS_0,
        ProgressStage::P25 => PROGRESS_25,
        ProgressStage::P50 => PROGRESS_50,
        ProgressStage::P75 => PROGRESS_75,
        ProgressStage::P100 => PROGRESS_100,
    };
    ImageBytes::Static(bytes)
}
