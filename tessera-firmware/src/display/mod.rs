//! Display output
//!
//! The LED matrix pixel bus and the WebP codec used by the render thread.

pub mod matrix;
pub mod webp;

pub use matrix::MatrixBus;
pub use webp::WebpCodec;
