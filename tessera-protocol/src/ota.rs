//! OTA request and status payloads
//!
//! Update requests arrive as a small JSON document:
//!
//! ```text
//! POST /ota
//! {"url": "http://host/firmware.bin", "MD5": "9e107d9d372bb6826bd81d3542a419d6", "version": "1.4.0"}
//! ```
//!
//! The checksum key is accepted as either `MD5` or `md5`; `version` and
//! `size` are optional. Status is reported back as
//! `{"status": "IN_PROGRESS", "progress": 42}`.

use alloc::vec::Vec;

use heapless::String;
use serde::{Deserialize, Serialize};

/// Largest request body accepted by the intake endpoint
pub const MAX_INVITE_SIZE: usize = 1024;
/// Longest firmware URL accepted
pub const MAX_URL_LEN: usize = 256;
/// Hex characters in an MD5 digest
pub const CHECKSUM_HEX_LEN: usize = 32;
/// Longest version label accepted
pub const MAX_VERSION_LEN: usize = 32;

/// Lifecycle state of a firmware update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtaState {
    /// No update requested since boot
    #[serde(alias = "OTA_IDLE")]
    Idle,
    /// Request accepted, waiting for the apply loop
    #[serde(alias = "OTA_QUEUED")]
    Queued,
    /// Image is being streamed to flash
    #[serde(alias = "OTA_IN_PROGRESS")]
    InProgress,
    /// Image written and verified, restart pending
    #[serde(alias = "OTA_SUCCESS")]
    Success,
    /// Last attempt failed, old firmware still running
    #[serde(alias = "OTA_FAILED")]
    Failed,
}

impl OtaState {
    /// Wire name of the state
    pub fn as_str(self) -> &'static str {
        match self {
            OtaState::Idle => "IDLE",
            OtaState::Queued => "QUEUED",
            OtaState::InProgress => "IN_PROGRESS",
            OtaState::Success => "SUCCESS",
            OtaState::Failed => "FAILED",
        }
    }

    /// An update is waiting or running
    pub fn is_busy(self) -> bool {
        matches!(self, OtaState::Queued | OtaState::InProgress)
    }

    /// The last attempt has finished one way or the other
    pub fn is_terminal(self) -> bool {
        matches!(self, OtaState::Success | OtaState::Failed)
    }
}

/// Reasons an update request is refused at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InviteError {
    /// Empty request body
    Empty,
    /// Body larger than [`MAX_INVITE_SIZE`]
    TooLarge,
    /// Not valid JSON, or a field exceeded its length limit
    Malformed,
    /// `url` absent or empty
    MissingUrl,
    /// Checksum absent or empty
    MissingChecksum,
}

impl core::fmt::Display for InviteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InviteError::Empty => write!(f, "empty request body"),
            InviteError::TooLarge => write!(f, "request body too large"),
            InviteError::Malformed => write!(f, "malformed JSON payload"),
            InviteError::MissingUrl => write!(f, "missing 'url'"),
            InviteError::MissingChecksum => write!(f, "missing 'MD5'"),
        }
    }
}

#[derive(Deserialize)]
struct RawInvite {
    #[serde(default)]
    url: Option<String<MAX_URL_LEN>>,
    #[serde(default, alias = "MD5")]
    md5: Option<String<CHECKSUM_HEX_LEN>>,
    #[serde(default)]
    version: Option<String<MAX_VERSION_LEN>>,
    #[serde(default)]
    size: Option<u32>,
}

/// A well-formed update request as received over the wire
///
/// Only presence and length are checked here; URL scheme and checksum
/// encoding are validated when the request is turned into a pending update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInvite {
    pub url: String<MAX_URL_LEN>,
    pub md5: String<CHECKSUM_HEX_LEN>,
    pub version: String<MAX_VERSION_LEN>,
    /// Declared image size in bytes, if the sender knows it
    pub size: Option<u32>,
}

/// Parse an update request body
pub fn parse_update_invite(body: &[u8]) -> Result<UpdateInvite, InviteError> {
    if body.is_empty() {
        return Err(InviteError::Empty);
    }
    if body.len() > MAX_INVITE_SIZE {
        return Err(InviteError::TooLarge);
    }

    let raw: RawInvite = serde_json::from_slice(body).map_err(|_| InviteError::Malformed)?;

    let url = raw
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(InviteError::MissingUrl)?;
    let md5 = raw
        .md5
        .filter(|m| !m.trim().is_empty())
        .ok_or(InviteError::MissingChecksum)?;

    Ok(UpdateInvite {
        url,
        md5,
        version: raw.version.unwrap_or_default(),
        size: raw.size,
    })
}

/// Status payload served by the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub status: OtaState,
    pub progress: u8,
}

impl StatusReport {
    /// Encode as JSON
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Error payload for rejected requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorReply<'a> {
    pub error: &'a str,
}

impl<'a> ErrorReply<'a> {
    pub fn new(error: &'a str) -> Self {
        Self { error }
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uppercase_checksum_key() {
        let body = br#"{"url":"http://10.0.0.2/fw.bin","MD5":"9e107d9d372bb6826bd81d3542a419d6","version":"1.4.0"}"#;
        let invite = parse_update_invite(body).unwrap();

        assert_eq!(invite.url.as_str(), "http://10.0.0.2/fw.bin");
        assert_eq!(invite.md5.as_str(), "9e107d9d372bb6826bd81d3542a419d6");
        assert_eq!(invite.version.as_str(), "1.4.0");
        assert_eq!(invite.size, None);
    }

    #[test]
    fn test_parse_lowercase_checksum_key_and_size() {
        let body = br#"{"url":"http://h/fw.bin","md5":"00112233445566778899aabbccddeeff","size":1048576}"#;
        let invite = parse_update_invite(body).unwrap();

        assert_eq!(invite.size, Some(1_048_576));
        assert!(invite.version.is_empty());
    }

    #[test]
    fn test_missing_checksum_rejected() {
        let body = br#"{"url":"http://h/fw.bin","version":"2"}"#;
        assert_eq!(parse_update_invite(body), Err(InviteError::MissingChecksum));
    }

    #[test]
    fn test_missing_url_rejected() {
        let body = br#"{"url":"  ","MD5":"00112233445566778899aabbccddeeff"}"#;
        assert_eq!(parse_update_invite(body), Err(InviteError::MissingUrl));
    }

    #[test]
    fn test_malformed_and_oversized() {
        assert_eq!(parse_update_invite(b""), Err(InviteError::Empty));
        assert_eq!(parse_update_invite(b"{url:"), Err(InviteError::Malformed));

        let long = [b' '; MAX_INVITE_SIZE + 1];
        assert_eq!(parse_update_invite(&long), Err(InviteError::TooLarge));

        // Checksum longer than an MD5 hex digest
        let body = br#"{"url":"http://h/fw.bin","MD5":"00112233445566778899aabbccddeeff00"}"#;
        assert_eq!(parse_update_invite(body), Err(InviteError::Malformed));
    }

    #[test]
    fn test_status_report_json() {
        let report = StatusReport {
            status: OtaState::InProgress,
            progress: 42,
        };
        let json = report.to_json().unwrap();
        assert_eq!(json.as_slice(), br#"{"status":"IN_PROGRESS","progress":42}"#);
    }

    #[test]
    fn test_state_accepts_prefixed_names() {
        let report: StatusReport =
            serde_json::from_slice(br#"{"status":"OTA_SUCCESS","progress":100}"#).unwrap();
        assert_eq!(report.status, OtaState::Success);
    }

    #[test]
    fn test_state_predicates() {
        assert!(OtaState::Queued.is_busy());
        assert!(OtaState::InProgress.is_busy());
        assert!(!OtaState::Failed.is_busy());
        assert!(OtaState::Success.is_terminal());
        assert!(!OtaState::Idle.is_terminal());
        assert_eq!(OtaState::InProgress.as_str(), "IN_PROGRESS");
    }

    #[test]
    fn test_error_reply_json() {
        let json = ErrorReply::new("busy").to_json().unwrap();
        assert_eq!(json.as_slice(), br#"{"error":"busy"}"#);
    }
}
