//! Pixel bus trait
//!
//! This trait abstracts the LED matrix driver (WS2812 chains, HUB75 panels,
//! or an in-memory framebuffer for tests).

/// Errors that can occur pushing pixels to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The transfer to the panel failed
    Transfer,
    /// The driver is not ready
    NotReady,
}

/// Trait for LED matrix drivers
///
/// Implementations keep a back buffer; `set_pixel` writes to it and
/// `present` makes it visible. Only the render context calls these.
pub trait PixelBus {
    /// Panel width in pixels
    fn width(&self) -> u16;

    /// Panel height in pixels
    fn height(&self) -> u16;

    /// Write one pixel to the back buffer
    ///
    /// Coordinates outside the panel are ignored.
    fn set_pixel(&mut self, x: u16, y: u16, r: u8, g: u8, b: u8);

    /// Make the back buffer visible
    fn present(&mut self) -> Result<(), BusError>;

    /// Blank the panel immediately
    fn clear(&mut self) -> Result<(), BusError>;

    /// Set global brightness (0-100 percent)
    fn set_brightness(&mut self, percent: u8);
}
