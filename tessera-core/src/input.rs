//! Front-panel buttons
//!
//! Button presses become render commands. The mapper tracks the panel
//! brightness it last asked for so repeated presses step from there.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};

use crate::palette::PaletteMode;
use crate::render::RenderCommand;
use crate::slots::SlotStore;

/// How often the button lines are sampled
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Presses closer together than this are ignored
pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// Brightness change per press, in percent
pub const BRIGHTNESS_STEP: u8 = 5;

/// Button actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Switch the active image between normal and night colors
    NightToggle,
    BrightnessUp,
    BrightnessDown,
    /// Step the active image to the next palette
    PaletteCycle,
}

/// Maps button events to render commands
#[derive(Debug, Clone)]
pub struct ButtonMapper {
    brightness: u8,
    last_press: Option<Instant>,
}

impl ButtonMapper {
    pub fn new(brightness: u8) -> Self {
        Self {
            brightness: brightness.min(100),
            last_press: None,
        }
    }

    /// Last brightness sent to the panel
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Record a brightness set elsewhere (e.g. by a fetch directive)
    pub fn set_brightness(&mut self, percent: u8) {
        self.brightness = percent.min(100);
    }

    /// Debounce a press seen at `now`
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_press {
            Some(last) if now.saturating_duration_since(last) < DEBOUNCE => false,
            _ => {
                self.last_press = Some(now);
                true
            }
        }
    }

    /// Command for a button event
    ///
    /// Palette changes target whichever slot is active at the time of the
    /// press.
    pub fn map<M: RawMutex>(&mut self, event: ButtonEvent, slots: &SlotStore<M>) -> RenderCommand {
        match event {
            ButtonEvent::BrightnessUp => {
                self.brightness = self.brightness.saturating_add(BRIGHTNESS_STEP).min(100);
                RenderCommand::SetBrightness(self.brightness)
            }
            ButtonEvent::BrightnessDown => {
                self.brightness = self.brightness.saturating_sub(BRIGHTNESS_STEP);
                RenderCommand::SetBrightness(self.brightness)
            }
            ButtonEvent::NightToggle | ButtonEvent::PaletteCycle => {
                let active = slots.read_active();
                let palette = match event {
                    ButtonEvent::NightToggle if active.meta.palette == PaletteMode::Night => {
                        PaletteMode::Normal
                    }
                    ButtonEvent::NightToggle => PaletteMode::Night,
                    _ => active.meta.palette.next(),
                };
                RenderCommand::SetPalette(active.index, palette)
            }
        }
    }
}
