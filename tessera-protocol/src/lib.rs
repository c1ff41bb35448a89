//! Tessera wire contracts
//!
//! This crate defines everything the firmware exchanges with the outside
//! world that is not pixel data:
//!
//! - Display directives carried as response headers by the content service
//! - The JSON payloads accepted and produced by the OTA endpoints
//! - The container signature check applied to incoming images
//!
//! # Content Service Headers
//!
//! ```text
//! GET <refresh url>
//!
//! 200 OK
//! Content-Length: 18342          (optional, drives buffer sizing)
//! Tronbyt-Brightness: 40         (optional, percent, clamped to 0-100)
//! Tronbyt-Dwell-Secs: 15         (optional, seconds)
//! Tronbyt-Palette: 3             (optional, palette index)
//!
//! <RIFF....WEBP body>
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod directives;
pub mod image;
pub mod ota;

pub use directives::{
    Directives, HEADER_BRIGHTNESS, HEADER_CONTENT_LENGTH, HEADER_DWELL_SECS, HEADER_PALETTE,
    MAX_BRIGHTNESS,
};
pub use image::{is_webp, SIGNATURE_LEN};
pub use ota::{
    parse_update_invite, ErrorReply, InviteError, OtaState, StatusReport, UpdateInvite,
    MAX_INVITE_SIZE,
};
