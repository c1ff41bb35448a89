//! HTTP client trait
//!
//! Used for both content refresh and firmware download. Responses are read
//! as a stream through `embedded_io::Read`.

use embedded_io::Read;
use tessera_protocol::directives::{parse_content_length, HEADER_CONTENT_LENGTH};

/// Errors opening a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Could not resolve or connect
    Connect,
    /// The request timed out
    Timeout,
    /// Malformed URL or request
    InvalidRequest,
    /// The connection dropped while streaming the body
    Interrupted,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::Connect => write!(f, "connection failed"),
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::InvalidRequest => write!(f, "invalid request"),
            TransportError::Interrupted => write!(f, "connection interrupted"),
        }
    }
}

/// A response whose headers have arrived and whose body can be streamed
pub trait HttpResponse: Read {
    /// HTTP status code
    fn status(&self) -> u16;

    /// Look up a response header, case-insensitively
    fn header(&self, name: &str) -> Option<&str>;

    /// Declared body size
    fn content_length(&self) -> Option<usize> {
        self.header(HEADER_CONTENT_LENGTH)
            .and_then(parse_content_length)
    }
}

/// Blocking HTTP client
pub trait HttpClient {
    type Response<'a>: HttpResponse
    where
        Self: 'a;

    /// Issue a GET request
    fn get<'a>(&'a mut self, url: &str) -> Result<Self::Response<'a>, TransportError>;
}
