//! Slot-based image store
//!
//! A small fixed set of image slots. One slot is active and feeds the
//! renderer; the others are write targets for incoming content. Slot 0
//! holds the boot image.

mod buffer;
mod store;

pub use buffer::{AllocError, ImageBuffer, ImageBytes, READ_CHUNK};
pub use store::{MetaUpdate, SlotError, SlotMeta, SlotSnapshot, SlotStore, BOOT_SLOT, SLOT_COUNT};
