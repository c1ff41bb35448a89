use alloc::sync::Arc;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use tessera_protocol::is_webp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::buffer::{ImageBuffer, ImageBytes};
use crate::error::{Classify, ErrorClass};
use crate::palette::PaletteMode;

/// Number of image slots
pub const SLOT_COUNT: usize = 4;

/// Slot holding the boot image
pub const BOOT_SLOT: usize = 0;

/// Per-slot display metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotMeta {
    /// Seconds to keep the image on screen, 0 = until replaced
    pub dwell_secs: u32,
    pub palette: PaletteMode,
}

/// Metadata changes applied by a write; `None` keeps the old value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MetaUpdate {
    pub dwell_secs: Option<u32>,
    pub palette: Option<PaletteMode>,
}

impl MetaUpdate {
    pub fn new(dwell_secs: u32, palette: PaletteMode) -> Self {
        Self {
            dwell_secs: Some(dwell_secs),
            palette: Some(palette),
        }
    }
}

impl From<SlotMeta> for MetaUpdate {
    fn from(meta: SlotMeta) -> Self {
        Self::new(meta.dwell_secs, meta.palette)
    }
}

/// Slot store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotError {
    /// Index beyond the slot table
    OutOfRange,
    /// The slot is active (or the index is unusable) for this operation
    InvalidTarget,
    /// Payload failed the container signature check
    BadPayload,
    /// Could not grow the slot buffer; previous contents kept
    OutOfMemory,
    /// The slot holds no image
    Empty,
}

impl core::fmt::Display for SlotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SlotError::OutOfRange => write!(f, "slot index out of range"),
            SlotError::InvalidTarget => write!(f, "invalid target slot"),
            SlotError::BadPayload => write!(f, "payload is not a WebP image"),
            SlotError::OutOfMemory => write!(f, "out of memory"),
            SlotError::Empty => write!(f, "slot is empty"),
        }
    }
}

impl Classify for SlotError {
    fn class(&self) -> ErrorClass {
        match self {
            SlotError::OutOfMemory => ErrorClass::ResourceExhaustion,
            _ => ErrorClass::Malformed,
        }
    }
}

/// Consistent view of one slot
///
/// Holds its own handle on the image; no lock is held while it is alive.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    pub index: usize,
    pub image: ImageBytes,
    pub meta: SlotMeta,
}

struct Slot {
    image: Option<ImageBytes>,
    meta: SlotMeta,
}

impl Slot {
    const fn empty() -> Self {
        Self {
            image: None,
            meta: SlotMeta {
                dwell_secs: 0,
                palette: PaletteMode::Normal,
            },
        }
    }

    fn capacity(&self) -> usize {
        match &self.image {
            Some(ImageBytes::Shared(buf)) => buf.capacity(),
            Some(ImageBytes::Static(bytes)) => bytes.len(),
            None => 0,
        }
    }

    /// Copy `bytes` in, reusing storage when no reader holds it
    fn store(&mut self, bytes: &[u8]) -> Result<(), SlotError> {
        if let Some(ImageBytes::Shared(arc)) = &mut self.image {
            if let Some(buf) = Arc::get_mut(arc) {
                return buf.replace_with(bytes).map_err(|_| SlotError::OutOfMemory);
            }
        }

        // Storage is shared with a decoder (or static): build a fresh buffer
        // first, then swap it in so a failed allocation changes nothing
        let capacity = self.capacity().max(bytes.len());
        let mut buf = ImageBuffer::with_capacity(capacity).map_err(|_| SlotError::OutOfMemory)?;
        buf.replace_with(bytes).map_err(|_| SlotError::OutOfMemory)?;
        self.image = Some(ImageBytes::from(buf));
        Ok(())
    }

    fn snapshot(&self, index: usize) -> Result<SlotSnapshot, SlotError> {
        let image = self.image.clone().ok_or(SlotError::Empty)?;
        Ok(SlotSnapshot {
            index,
            image,
            meta: self.meta,
        })
    }
}

struct Slots {
    entries: [Slot; SLOT_COUNT],
    active: usize,
}

/// The device-wide image store
///
/// All state sits behind one blocking mutex; every critical section is a
/// metadata update, a handle clone, or a single memcpy.
pub struct SlotStore<M: RawMutex> {
    inner: Mutex<M, RefCell<Slots>>,
}

impl<M: RawMutex> SlotStore<M> {
    /// Create the store with `boot` in slot 0, active
    pub fn new(boot: &'static [u8]) -> Self {
        let mut entries = [Slot::empty(), Slot::empty(), Slot::empty(), Slot::empty()];
        entries[BOOT_SLOT].image = Some(ImageBytes::Static(boot));

        Self {
            inner: Mutex::new(RefCell::new(Slots {
                entries,
                active: BOOT_SLOT,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Slots) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Copy an image into a non-active slot
    ///
    /// The boot slot is read-only.
    pub fn write_slot(&self, index: usize, bytes: &[u8], meta: MetaUpdate) -> Result<(), SlotError> {
        if !is_webp(bytes) {
            return Err(SlotError::BadPayload);
        }

        self.with(|slots| {
            if index >= SLOT_COUNT || index == slots.active || index == BOOT_SLOT {
                return Err(SlotError::InvalidTarget);
            }

            let slot = &mut slots.entries[index];
            slot.store(bytes)?;
            if let Some(dwell) = meta.dwell_secs {
                slot.meta.dwell_secs = dwell;
            }
            if let Some(palette) = meta.palette {
                slot.meta.palette = palette;
            }
            Ok(())
        })
    }

    /// Make `index` the active slot
    pub fn activate(&self, index: usize) -> Result<(), SlotError> {
        self.with(|slots| {
            if index >= SLOT_COUNT {
                return Err(SlotError::OutOfRange);
            }
            if index == slots.active {
                return Err(SlotError::InvalidTarget);
            }
            if slots.entries[index].image.is_none() {
                return Err(SlotError::Empty);
            }
            slots.active = index;
            Ok(())
        })
    }

    /// Snapshot of the active slot
    pub fn read_active(&self) -> SlotSnapshot {
        self.with(|slots| {
            let index = slots.active;
            let slot = &slots.entries[index];
            SlotSnapshot {
                index,
                // Only non-empty slots can become active and the active one
                // cannot be freed
                image: slot
                    .image
                    .clone()
                    .unwrap_or(ImageBytes::Static(&[])),
                meta: slot.meta,
            }
        })
    }

    /// Snapshot of any slot
    pub fn read_slot(&self, index: usize) -> Result<SlotSnapshot, SlotError> {
        self.with(|slots| {
            slots
                .entries
                .get(index)
                .ok_or(SlotError::OutOfRange)?
                .snapshot(index)
        })
    }

    /// Release a slot's storage
    ///
    /// Refused for the active slot and the boot slot.
    pub fn free_slot(&self, index: usize) -> Result<(), SlotError> {
        self.with(|slots| {
            if index >= SLOT_COUNT {
                return Err(SlotError::OutOfRange);
            }
            if index == slots.active || index == BOOT_SLOT {
                return Err(SlotError::InvalidTarget);
            }
            slots.entries[index] = Slot::empty();
            Ok(())
        })
    }

    /// Change a slot's palette
    pub fn set_palette(&self, index: usize, palette: PaletteMode) -> Result<(), SlotError> {
        self.with(|slots| {
            let slot = slots.entries.get_mut(index).ok_or(SlotError::OutOfRange)?;
            slot.meta.palette = palette;
            Ok(())
        })
    }

    pub fn metadata(&self, index: usize) -> Result<SlotMeta, SlotError> {
        self.with(|slots| {
            slots
                .entries
                .get(index)
                .map(|slot| slot.meta)
                .ok_or(SlotError::OutOfRange)
        })
    }

    pub fn active_index(&self) -> usize {
        self.with(|slots| slots.active)
    }

    /// Allocated bytes behind a slot
    pub fn capacity(&self, index: usize) -> Result<usize, SlotError> {
        self.with(|slots| {
            slots
                .entries
                .get(index)
                .map(Slot::capacity)
                .ok_or(SlotError::OutOfRange)
        })
    }

    /// First slot that is neither active nor the boot slot
    pub fn spare_slot(&self) -> Option<usize> {
        self.with(|slots| (0..SLOT_COUNT).find(|&i| i != slots.active && i != BOOT_SLOT))
    }
}
