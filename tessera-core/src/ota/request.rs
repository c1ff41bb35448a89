use heapless::String;
use tessera_protocol::ota::{MAX_URL_LEN, MAX_VERSION_LEN};
use tessera_protocol::{InviteError, UpdateInvite};

use crate::error::{Classify, ErrorClass};

/// Why an update request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// The wire payload was unusable
    Invite(InviteError),
    /// URL is not http:// or https:// with a host
    UnsupportedUrl,
    /// Checksum is not 32 hex digits
    BadChecksum,
    /// Declared size exceeds the update partition
    TooLarge,
}

impl core::fmt::Display for RequestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequestError::Invite(e) => write!(f, "{}", e),
            RequestError::UnsupportedUrl => write!(f, "url must be http:// or https://"),
            RequestError::BadChecksum => write!(f, "checksum must be 32 hex digits"),
            RequestError::TooLarge => write!(f, "image larger than update partition"),
        }
    }
}

impl Classify for RequestError {
    fn class(&self) -> ErrorClass {
        match self {
            RequestError::TooLarge => ErrorClass::ResourceExhaustion,
            _ => ErrorClass::Malformed,
        }
    }
}

impl From<InviteError> for RequestError {
    fn from(e: InviteError) -> Self {
        RequestError::Invite(e)
    }
}

/// A validated, immutable update request
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateRequest {
    pub url: String<MAX_URL_LEN>,
    /// Expected MD5 of the image
    pub checksum: [u8; 16],
    pub version: String<MAX_VERSION_LEN>,
    /// Declared image size, if known up front
    pub size: Option<u32>,
}

impl UpdateRequest {
    pub fn new(url: &str, checksum_hex: &str, version: &str) -> Result<Self, RequestError> {
        let url = check_url(url)?;
        let mut stored = String::new();
        stored
            .push_str(url)
            .map_err(|_| RequestError::UnsupportedUrl)?;

        let mut label = String::new();
        // Over-long labels are cut rather than rejected
        for c in version.chars() {
            if label.push(c).is_err() {
                break;
            }
        }

        Ok(Self {
            url: stored,
            checksum: decode_checksum(checksum_hex)?,
            version: label,
            size: None,
        })
    }

    /// Validate a parsed wire payload
    pub fn from_invite(invite: &UpdateInvite) -> Result<Self, RequestError> {
        let mut request = Self::new(&invite.url, &invite.md5, &invite.version)?;
        request.size = invite.size;
        Ok(request)
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Check the request against the update partition size
    pub fn validate(&self, max_image_size: usize) -> Result<(), RequestError> {
        match self.size {
            Some(size) if size as usize > max_image_size => Err(RequestError::TooLarge),
            _ => Ok(()),
        }
    }
}

fn check_url(url: &str) -> Result<&str, RequestError> {
    let url = url.trim();
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or(RequestError::UnsupportedUrl)?;

    let host = rest.split('/').next().unwrap_or("");
    if host.is_empty() {
        return Err(RequestError::UnsupportedUrl);
    }
    Ok(url)
}

fn decode_checksum(hex_digest: &str) -> Result<[u8; 16], RequestError> {
    let mut out = [0u8; 16];
    hex::decode_to_slice(hex_digest.trim(), &mut out).map_err(|_| RequestError::BadChecksum)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_protocol::parse_update_invite;

    const MD5_HEX: &str = "9e107d9d372bb6826bd81d3542a419d6";

    #[test]
    fn test_valid_request() {
        let req = UpdateRequest::new("http://10.0.0.2:8000/fw.bin", MD5_HEX, "1.4.0").unwrap();
        assert_eq!(req.url.as_str(), "http://10.0.0.2:8000/fw.bin");
        assert_eq!(req.checksum[0], 0x9e);
        assert_eq!(req.checksum[15], 0xd6);
        assert_eq!(req.version.as_str(), "1.4.0");
    }

    #[test]
    fn test_rejects_bad_urls() {
        for url in ["ftp://host/fw.bin", "http:///fw.bin", "fw.bin", ""] {
            assert_eq!(
                UpdateRequest::new(url, MD5_HEX, ""),
                Err(RequestError::UnsupportedUrl),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_rejects_bad_checksum() {
        assert_eq!(
            UpdateRequest::new("http://h/fw.bin", "not-hex", ""),
            Err(RequestError::BadChecksum)
        );
        assert_eq!(
            UpdateRequest::new("http://h/fw.bin", "9e107d9d", ""),
            Err(RequestError::BadChecksum)
        );
    }

    #[test]
    fn test_size_limit() {
        let req = UpdateRequest::new("https://h/fw.bin", MD5_HEX, "")
            .unwrap()
            .with_size(2_000_000);
        assert_eq!(req.validate(1_000_000), Err(RequestError::TooLarge));
        assert_eq!(req.validate(4_000_000), Ok(()));
    }

    #[test]
    fn test_from_invite() {
        let body = br#"{"url":"http://h/fw.bin","md5":"9e107d9d372bb6826bd81d3542a419d6","size":4096}"#;
        let invite = parse_update_invite(body).unwrap();
        let req = UpdateRequest::from_invite(&invite).unwrap();
        assert_eq!(req.size, Some(4096));
    }

    #[test]
    fn test_long_version_truncated() {
        let long = "v".repeat(100);
        let req = UpdateRequest::new("http://h/fw.bin", MD5_HEX, &long).unwrap();
        assert_eq!(req.version.len(), MAX_VERSION_LEN);
    }
}
