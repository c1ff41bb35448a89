//! ESP-IDF HTTP client adapter
//!
//! Implements the core `HttpClient` trait over `EspHttpConnection`. Used
//! for content refresh and for firmware downloads.

use core::time::Duration;

use embedded_io::{Error as _, ErrorKind, ErrorType, Read};
use embedded_svc::http::client::{Client, Response};
use embedded_svc::http::{Headers, Method, Status};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use log::warn;

use tessera_core::traits::{HttpClient, HttpResponse, TransportError};

/// Blocking HTTP client
pub struct EspHttp {
    client: Client<EspHttpConnection>,
}

impl EspHttp {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let config = Configuration {
            timeout: Some(timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            buffer_size: Some(2048),
            ..Default::default()
        };
        Ok(Self {
            client: Client::wrap(EspHttpConnection::new(&config)?),
        })
    }
}

/// Streaming response body
pub struct EspResponse<'a> {
    inner: Response<&'a mut EspHttpConnection>,
}

impl ErrorType for EspResponse<'_> {
    type Error = ErrorKind;
}

impl Read for EspResponse<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        self.inner.read(buf).map_err(|e| e.kind())
    }
}

impl HttpResponse for EspResponse<'_> {
    fn status(&self) -> u16 {
        Status::status(&self.inner)
    }

    fn header(&self, name: &str) -> Option<&str> {
        Headers::header(&self.inner, name)
    }
}

impl HttpClient for EspHttp {
    type Response<'a> = EspResponse<'a>
    where
        Self: 'a;

    fn get<'a>(&'a mut self, url: &str) -> Result<EspResponse<'a>, TransportError> {
        let request = self
            .client
            .request(Method::Get, url, &[("Accept", "image/webp")])
            .map_err(|e| {
                warn!("HTTP request to {} failed: {:?}", url, e);
                TransportError::InvalidRequest
            })?;

        let inner = request.submit().map_err(|e| {
            warn!("HTTP submit to {} failed: {:?}", url, e);
            match e.kind() {
                ErrorKind::TimedOut => TransportError::Timeout,
                _ => TransportError::Connect,
            }
        })?;

        Ok(EspResponse { inner })
    }
}
