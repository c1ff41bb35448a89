//! Image container signature
//!
//! Only the RIFF/WEBP envelope is checked here. Anything deeper is left to
//! the codec, which reports its own errors when a draw is attempted.

/// Bytes needed to recognise the container
pub const SIGNATURE_LEN: usize = 12;

const RIFF_TAG: &[u8; 4] = b"RIFF";
const WEBP_TAG: &[u8; 4] = b"WEBP";

/// Check whether `bytes` starts with a WebP container header
///
/// ```text
/// offset 0   "RIFF"
/// offset 4   u32 LE chunk size (not checked)
/// offset 8   "WEBP"
/// ```
pub fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() >= SIGNATURE_LEN && &bytes[0..4] == RIFF_TAG && &bytes[8..12] == WEBP_TAG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_webp_header() {
        assert!(is_webp(b"RIFF\x10\x00\x00\x00WEBPVP8L"));
    }

    #[test]
    fn test_rejects_short_buffer() {
        assert!(!is_webp(b"RIFF\x10\x00\x00\x00WEB"));
        assert!(!is_webp(&[]));
    }

    #[test]
    fn test_rejects_other_riff() {
        assert!(!is_webp(b"RIFF\x10\x00\x00\x00WAVEfmt "));
        assert!(!is_webp(b"GIF89a\x00\x00\x00\x00\x00\x00"));
    }
}
