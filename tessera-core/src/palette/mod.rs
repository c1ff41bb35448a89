//! Color palette transforms
//!
//! Each palette is a 3×3 matrix applied to the RGB channels of every
//! decoded frame before it reaches the pixel bus. Alpha is never touched.

mod matrix;

pub use matrix::{apply, ColorMatrix};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of palettes in the catalogue
pub const PALETTE_COUNT: usize = 12;

/// Named palette modes, in catalogue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum PaletteMode {
    #[default]
    Normal = 0,
    Night,
    Dimmed,
    Cool,
    Warm,
    Pastel,
    Moonlight,
    Dusk,
    Vintage,
    Monochrome,
    Sunrise,
    Cyber,
}

impl PaletteMode {
    /// All modes in catalogue order
    pub const ALL: [PaletteMode; PALETTE_COUNT] = [
        PaletteMode::Normal,
        PaletteMode::Night,
        PaletteMode::Dimmed,
        PaletteMode::Cool,
        PaletteMode::Warm,
        PaletteMode::Pastel,
        PaletteMode::Moonlight,
        PaletteMode::Dusk,
        PaletteMode::Vintage,
        PaletteMode::Monochrome,
        PaletteMode::Sunrise,
        PaletteMode::Cyber,
    ];

    /// Resolve a catalogue index; unknown indices fall back to `Normal`
    pub fn from_index(index: u8) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(PaletteMode::Normal)
    }

    /// Catalogue index of this mode
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Next mode in catalogue order, wrapping after the last
    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % PALETTE_COUNT]
    }

    /// Identity transform, nothing to apply
    pub fn is_identity(self) -> bool {
        self == PaletteMode::Normal
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            PaletteMode::Normal => "NORMAL",
            PaletteMode::Night => "NIGHT",
            PaletteMode::Dimmed => "DIMMED",
            PaletteMode::Cool => "COOL",
            PaletteMode::Warm => "WARM",
            PaletteMode::Pastel => "PASTEL",
            PaletteMode::Moonlight => "MOONLIGHT",
            PaletteMode::Dusk => "DUSK",
            PaletteMode::Vintage => "VINTAGE",
            PaletteMode::Monochrome => "BW",
            PaletteMode::Sunrise => "SUNRISE",
            PaletteMode::Cyber => "CYBER",
        }
    }

    /// Transform matrix for this mode
    pub fn matrix(self) -> &'static ColorMatrix {
        match self {
            PaletteMode::Normal => &matrix::IDENTITY,
            PaletteMode::Night => &matrix::NIGHT,
            PaletteMode::Dimmed => &matrix::DIMMED,
            PaletteMode::Cool => &matrix::COOL,
            PaletteMode::Warm => &matrix::WARM,
            PaletteMode::Pastel => &matrix::PASTEL,
            PaletteMode::Moonlight => &matrix::MOONLIGHT,
            PaletteMode::Dusk => &matrix::DUSK,
            PaletteMode::Vintage => &matrix::VINTAGE,
            PaletteMode::Monochrome => &matrix::MONOCHROME,
            PaletteMode::Sunrise => &matrix::SUNRISE,
            PaletteMode::Cyber => &matrix::CYBER,
        }
    }
}
