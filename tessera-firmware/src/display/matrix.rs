//! WS2812 LED matrix
//!
//! Keeps a framebuffer in RAM and pushes it to the LED chain on
//! `present()`, with gamma correction and global brightness applied on the
//! way out.

use smart_leds::{brightness, gamma, SmartLedsWrite, RGB8};

use tessera_core::traits::{BusError, PixelBus};

/// Framebuffer-backed pixel bus over a chain of smart LEDs
pub struct MatrixBus<W> {
    leds: W,
    frame: Vec<RGB8>,
    width: u16,
    height: u16,
    serpentine: bool,
    /// Output scale, 0-255
    level: u8,
}

impl<W> MatrixBus<W>
where
    W: SmartLedsWrite<Color = RGB8>,
{
    pub fn new(leds: W, width: u16, height: u16, serpentine: bool, brightness_pct: u8) -> Self {
        Self {
            leds,
            frame: vec![RGB8::default(); width as usize * height as usize],
            width,
            height,
            serpentine,
            level: percent_to_level(brightness_pct),
        }
    }

    /// Chain position of a pixel
    fn index(&self, x: u16, y: u16) -> usize {
        let (x, y, w) = (x as usize, y as usize, self.width as usize);
        if self.serpentine && y % 2 == 1 {
            y * w + (w - 1 - x)
        } else {
            y * w + x
        }
    }
}

fn percent_to_level(percent: u8) -> u8 {
    (percent.min(100) as u16 * 255 / 100) as u8
}

impl<W> PixelBus for MatrixBus<W>
where
    W: SmartLedsWrite<Color = RGB8>,
{
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn set_pixel(&mut self, x: u16, y: u16, r: u8, g: u8, b: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.frame[i] = RGB8::new(r, g, b);
    }

    fn present(&mut self) -> Result<(), BusError> {
        let pixels = brightness(gamma(self.frame.iter().copied()), self.level);
        self.leds.write(pixels).map_err(|_| BusError::Transfer)
    }

    fn clear(&mut self) -> Result<(), BusError> {
        self.frame.fill(RGB8::default());
        self.present()
    }

    fn set_brightness(&mut self, percent: u8) {
        self.level = percent_to_level(percent);
    }
}
