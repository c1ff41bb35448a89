//! Collaborator traits
//!
//! These traits are the narrow contracts between the core pipeline and the
//! board: the LED matrix, the image codec, the network stack and the
//! firmware flash writer.

mod codec;
mod firmware;
mod http;
mod pixel_bus;

pub use codec::{CanvasInfo, Codec, CodecError, DecodedFrame, FrameDecoder};
pub use firmware::{FirmwareSink, FirmwareUpdate, FlashError};
pub use http::{HttpClient, HttpResponse, TransportError};
pub use pixel_bus::{BusError, PixelBus};
