//! Display directives carried out-of-band as response headers
//!
//! The content service may attach brightness, dwell and palette hints to
//! each image. Every directive is optional; an absent or unparseable value
//! leaves the caller's current setting untouched.

/// Declared body size
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
/// Panel brightness in percent
pub const HEADER_BRIGHTNESS: &str = "Tronbyt-Brightness";
/// Seconds the image should stay on screen
pub const HEADER_DWELL_SECS: &str = "Tronbyt-Dwell-Secs";
/// Palette catalogue index
pub const HEADER_PALETTE: &str = "Tronbyt-Palette";

/// Maximum brightness percentage
pub const MAX_BRIGHTNESS: u8 = 100;

/// Directives extracted from one response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Directives {
    /// Brightness percent, already clamped to 0-100
    pub brightness: Option<u8>,
    /// Dwell time in seconds
    pub dwell_secs: Option<u32>,
    /// Raw palette index (unknown indices are resolved by the consumer)
    pub palette: Option<u8>,
}

impl Directives {
    /// Collect directives through a header lookup function
    ///
    /// The lookup is expected to match header names case-insensitively.
    pub fn from_lookup<'a>(lookup: impl Fn(&'static str) -> Option<&'a str>) -> Self {
        Self {
            brightness: lookup(HEADER_BRIGHTNESS).and_then(parse_brightness),
            dwell_secs: lookup(HEADER_DWELL_SECS).and_then(parse_dwell),
            palette: lookup(HEADER_PALETTE).and_then(parse_palette),
        }
    }

    /// Whether the response carried no directives at all
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.dwell_secs.is_none() && self.palette.is_none()
    }
}

/// Parse a brightness header, clamping into 0-100
pub fn parse_brightness(value: &str) -> Option<u8> {
    let raw: i64 = value.trim().parse().ok()?;
    Some(raw.clamp(0, MAX_BRIGHTNESS as i64) as u8)
}

/// Parse a dwell header; negative values are ignored
pub fn parse_dwell(value: &str) -> Option<u32> {
    let raw: i64 = value.trim().parse().ok()?;
    u32::try_from(raw).ok()
}

/// Parse a palette index header
pub fn parse_palette(value: &str) -> Option<u8> {
    value.trim().parse().ok()
}

/// Parse a Content-Length header
pub fn parse_content_length(value: &str) -> Option<usize> {
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_brightness_clamped() {
        assert_eq!(parse_brightness("40"), Some(40));
        assert_eq!(parse_brightness("250"), Some(100));
        assert_eq!(parse_brightness("-3"), Some(0));
        assert_eq!(parse_brightness(" 7 "), Some(7));
        assert_eq!(parse_brightness("bright"), None);
    }

    #[test]
    fn test_dwell_rejects_negative() {
        assert_eq!(parse_dwell("15"), Some(15));
        assert_eq!(parse_dwell("-1"), None);
        assert_eq!(parse_dwell(""), None);
    }

    #[test]
    fn test_palette_index() {
        assert_eq!(parse_palette("3"), Some(3));
        assert_eq!(parse_palette("300"), None);
    }

    #[test]
    fn test_from_lookup_partial() {
        let directives = Directives::from_lookup(|name| match name {
            HEADER_BRIGHTNESS => Some("120"),
            HEADER_PALETTE => Some("2"),
            _ => None,
        });

        assert_eq!(directives.brightness, Some(100));
        assert_eq!(directives.dwell_secs, None);
        assert_eq!(directives.palette, Some(2));
        assert!(!directives.is_empty());
    }

    #[test]
    fn test_from_lookup_empty() {
        let directives = Directives::from_lookup(|_| None);
        assert!(directives.is_empty());
    }

    proptest! {
        #[test]
        fn test_brightness_always_in_range(raw in any::<i64>()) {
            let parsed = parse_brightness(&raw.to_string());
            prop_assert_eq!(parsed, Some(raw.clamp(0, 100) as u8));
        }
    }
}
