//! Board-agnostic core logic for the Tessera pixel display firmware
//!
//! Everything here is independent of the target chip:
//!
//! - Hardware and network abstraction traits (pixel bus, codec, HTTP, flash)
//! - Slot-based image store
//! - Render command queue and executor
//! - Palette engine
//! - Remote content fetcher and refresh planning
//! - OTA coordination and progress display
//! - Button mapping
//! - Configuration types

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod fetch;
pub mod input;
pub mod ota;
pub mod palette;
pub mod refresh;
pub mod render;
pub mod slots;
pub mod traits;

#[cfg(test)]
mod testing;
