//! Update intake and apply
//!
//! Intake (`submit_request`) never blocks: it validates, flips the status
//! to `Queued` and drops the request into a single-slot channel. A separate
//! apply context takes it from there with `next_request` and `run_update`.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};
use embedded_io::Read;
use md5::{Digest, Md5};
use tessera_protocol::parse_update_invite;

use super::request::{RequestError, UpdateRequest};
use super::status::{OtaStatus, StatusCell};
use crate::error::{Classify, ErrorClass};
use crate::traits::{FirmwareSink, FirmwareUpdate, FlashError, HttpClient, HttpResponse, TransportError};

/// Bytes streamed per chunk
pub const OTA_CHUNK_SIZE: usize = 4096;

/// OTA errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OtaError {
    /// An update is already queued or running
    Busy,
    /// The request was refused at intake
    InvalidRequest(RequestError),
    /// Download could not be opened or broke off
    Network(TransportError),
    /// Server answered with a non-2xx status
    HttpStatus(u16),
    /// Image exceeds the update partition
    TooLarge,
    /// Stream ended before the declared size
    Truncated,
    /// Server sent no data
    Empty,
    /// MD5 of the received image does not match
    ChecksumMismatch,
    /// Flash write or finalize failed
    Flash(FlashError),
}

impl core::fmt::Display for OtaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OtaError::Busy => write!(f, "update already in progress"),
            OtaError::InvalidRequest(e) => write!(f, "invalid request: {}", e),
            OtaError::Network(e) => write!(f, "download failed: {}", e),
            OtaError::HttpStatus(code) => write!(f, "download failed with HTTP {}", code),
            OtaError::TooLarge => write!(f, "image too large"),
            OtaError::Truncated => write!(f, "image truncated"),
            OtaError::Empty => write!(f, "image is empty"),
            OtaError::ChecksumMismatch => write!(f, "MD5 mismatch"),
            OtaError::Flash(e) => write!(f, "flash: {}", e),
        }
    }
}

impl Classify for OtaError {
    fn class(&self) -> ErrorClass {
        match self {
            OtaError::Busy => ErrorClass::Transient,
            OtaError::InvalidRequest(e) => e.class(),
            OtaError::TooLarge => ErrorClass::ResourceExhaustion,
            _ => ErrorClass::Fatal,
        }
    }
}

impl From<RequestError> for OtaError {
    fn from(e: RequestError) -> Self {
        OtaError::InvalidRequest(e)
    }
}

impl From<FlashError> for OtaError {
    fn from(e: FlashError) -> Self {
        OtaError::Flash(e)
    }
}

/// The device-wide update coordinator
pub struct OtaCoordinator<M: RawMutex> {
    status: StatusCell,
    requests: Channel<M, UpdateRequest, 1>,
    changed: Signal<M, OtaStatus>,
    max_image_size: usize,
}

impl<M: RawMutex> OtaCoordinator<M> {
    pub const fn new(max_image_size: usize) -> Self {
        Self {
            status: StatusCell::new(),
            requests: Channel::new(),
            changed: Signal::new(),
            max_image_size,
        }
    }

    /// Lock-free status snapshot
    pub fn status(&self) -> OtaStatus {
        self.status.load()
    }

    fn publish(&self) {
        self.changed.signal(self.status.load());
    }

    /// Accept an update request without blocking
    pub fn submit_request(&self, request: UpdateRequest) -> Result<(), OtaError> {
        request.validate(self.max_image_size)?;

        let previous = self.status.try_queue().map_err(|_| OtaError::Busy)?;
        if self.requests.try_send(request).is_err() {
            self.status.restore(previous);
            return Err(OtaError::Busy);
        }
        self.publish();
        Ok(())
    }

    /// Parse, validate and submit a raw request body
    pub fn submit_json(&self, body: &[u8]) -> Result<(), OtaError> {
        let invite = parse_update_invite(body).map_err(RequestError::from)?;
        self.submit_request(UpdateRequest::from_invite(&invite)?)
    }

    /// Wait for a queued request and mark it `InProgress`
    pub async fn next_request(&self) -> UpdateRequest {
        loop {
            let request = self.requests.receive().await;
            if self.status.begin() {
                self.publish();
                return request;
            }
        }
    }

    /// Non-blocking variant of [`Self::next_request`]
    pub fn try_next_request(&self) -> Option<UpdateRequest> {
        let request = self.requests.try_receive().ok()?;
        if self.status.begin() {
            self.publish();
            Some(request)
        } else {
            None
        }
    }

    /// Wait up to `timeout` for a status change
    pub async fn wait_for_change(&self, timeout: Duration) -> Option<OtaStatus> {
        with_timeout(timeout, self.changed.wait()).await.ok()
    }

    /// Stream the image into flash and verify it
    ///
    /// Must follow `next_request`. Ends in `Success` (the caller schedules
    /// the restart) or `Failed` (the running firmware is untouched).
    /// Returns the number of bytes written.
    pub fn run_update<C: HttpClient, S: FirmwareSink>(
        &self,
        request: &UpdateRequest,
        client: &mut C,
        sink: &mut S,
    ) -> Result<usize, OtaError> {
        let result = self.transfer(request, client, sink);
        self.status.finish(result.is_ok());
        self.publish();
        result
    }

    fn transfer<C: HttpClient, S: FirmwareSink>(
        &self,
        request: &UpdateRequest,
        client: &mut C,
        sink: &mut S,
    ) -> Result<usize, OtaError> {
        let mut response = client.get(&request.url).map_err(OtaError::Network)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(OtaError::HttpStatus(status));
        }

        let total = response
            .content_length()
            .or(request.size.map(|s| s as usize))
            .filter(|t| *t > 0);
        if total.is_some_and(|t| t > self.max_image_size) {
            return Err(OtaError::TooLarge);
        }

        let mut update = sink.begin()?;
        match self.stream(&mut response, &mut update, total, &request.checksum) {
            Ok(written) => {
                update.complete()?;
                Ok(written)
            }
            Err(e) => {
                // The stream error is the one worth reporting
                let _ = update.abort();
                Err(e)
            }
        }
    }

    fn stream<R: Read, U: FirmwareUpdate>(
        &self,
        response: &mut R,
        update: &mut U,
        total: Option<usize>,
        expected: &[u8; 16],
    ) -> Result<usize, OtaError> {
        let mut hasher = Md5::new();
        let mut chunk = [0u8; OTA_CHUNK_SIZE];
        let mut written = 0usize;

        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|_| OtaError::Network(TransportError::Interrupted))?;
            if read == 0 {
                break;
            }

            written += read;
            if written > self.max_image_size {
                return Err(OtaError::TooLarge);
            }

            update.write(&chunk[..read])?;
            hasher.update(&chunk[..read]);

            // Percent is suppressed when the size is unknown
            if let Some(total) = total {
                let percent = (written.saturating_mul(100) / total).min(100) as u8;
                if self.status.report_progress(percent).is_some() {
                    self.publish();
                }
            }
        }

        if written == 0 {
            return Err(OtaError::Empty);
        }
        if total.is_some_and(|t| written < t) {
            return Err(OtaError::Truncated);
        }

        let digest = hasher.finalize();
        if digest.as_slice() != expected {
            return Err(OtaError::ChecksumMismatch);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingWaker, MockFlash, MockHttp};
    use alloc::vec::Vec;
    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, Poll};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use tessera_protocol::OtaState;

    const MAX_IMAGE: usize = 64 * 1024;

    fn coordinator() -> OtaCoordinator<CriticalSectionRawMutex> {
        OtaCoordinator::new(MAX_IMAGE)
    }

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn request_for(body: &[u8]) -> UpdateRequest {
        let mut req =
            UpdateRequest::new("http://10.0.0.2/fw.bin", "00000000000000000000000000000000", "2.0")
                .unwrap();
        req.checksum = Md5::digest(body).into();
        req
    }

    #[test]
    fn test_submit_queues_and_rejects_second() {
        let ota = coordinator();
        let req = request_for(b"abc");

        ota.submit_request(req.clone()).unwrap();
        assert_eq!(ota.status().state, OtaState::Queued);
        assert_eq!(ota.submit_request(req), Err(OtaError::Busy));
    }

    #[test]
    fn test_submit_rejects_oversized_declaration() {
        let ota = coordinator();
        let req = request_for(b"abc").with_size(MAX_IMAGE as u32 + 1);

        assert_eq!(
            ota.submit_request(req),
            Err(OtaError::InvalidRequest(RequestError::TooLarge))
        );
        assert_eq!(ota.status().state, OtaState::Idle);
    }

    #[test]
    fn test_submit_json_missing_checksum() {
        let ota = coordinator();
        let result = ota.submit_json(br#"{"url":"http://h/fw.bin"}"#);

        assert_eq!(
            result,
            Err(OtaError::InvalidRequest(RequestError::Invite(
                tessera_protocol::InviteError::MissingChecksum
            )))
        );
        assert_eq!(ota.status().state, OtaState::Idle);
    }

    #[test]
    fn test_successful_update() {
        let ota = coordinator();
        let body = image(10_000);
        ota.submit_request(request_for(&body)).unwrap();

        let req = ota.try_next_request().unwrap();
        assert_eq!(ota.status().state, OtaState::InProgress);

        let mut http = MockHttp::ok(body.clone()).with_length();
        let mut flash = MockFlash::default();
        let written = ota.run_update(&req, &mut http, &mut flash).unwrap();

        assert_eq!(written, body.len());
        assert_eq!(flash.written, body);
        assert!(flash.completed);
        assert_eq!(
            ota.status(),
            OtaStatus {
                state: OtaState::Success,
                progress: 100
            }
        );
    }

    #[test]
    fn test_checksum_mismatch_fails() {
        let ota = coordinator();
        let body = image(5_000);
        let mut req = request_for(&body);
        req.checksum[0] ^= 0xFF;
        ota.submit_request(req).unwrap();
        let req = ota.try_next_request().unwrap();

        let mut http = MockHttp::ok(body).with_length();
        let mut flash = MockFlash::default();

        assert_eq!(
            ota.run_update(&req, &mut http, &mut flash),
            Err(OtaError::ChecksumMismatch)
        );
        assert!(flash.aborted);
        assert!(!flash.completed);
        assert_eq!(ota.status().state, OtaState::Failed);

        // A failed attempt can be retried
        assert!(ota.submit_request(request_for(b"x")).is_ok());
    }

    #[test]
    fn test_interrupted_download_fails() {
        let ota = coordinator();
        let body = image(8_000);
        ota.submit_request(request_for(&body)).unwrap();
        let req = ota.try_next_request().unwrap();

        let mut http = MockHttp::ok(body).with_length();
        http.fail_read_at = Some(3_000);
        let mut flash = MockFlash::default();

        assert_eq!(
            ota.run_update(&req, &mut http, &mut flash),
            Err(OtaError::Network(TransportError::Interrupted))
        );
        assert!(flash.aborted);
        let status = ota.status();
        assert_eq!(status.state, OtaState::Failed);
        assert!(status.progress < 100);
    }

    #[test]
    fn test_http_error_status() {
        let ota = coordinator();
        ota.submit_request(request_for(b"abc")).unwrap();
        let req = ota.try_next_request().unwrap();

        let mut http = MockHttp::ok(Vec::new());
        http.status = 404;
        let mut flash = MockFlash::default();

        assert_eq!(
            ota.run_update(&req, &mut http, &mut flash),
            Err(OtaError::HttpStatus(404))
        );
        assert_eq!(flash.begun, 0);
    }

    #[test]
    fn test_declared_size_too_large() {
        let ota = coordinator();
        ota.submit_request(request_for(b"abc")).unwrap();
        let req = ota.try_next_request().unwrap();

        let mut http = MockHttp::ok(Vec::new()).header("Content-Length", MAX_IMAGE + 1);
        let mut flash = MockFlash::default();

        assert_eq!(
            ota.run_update(&req, &mut http, &mut flash),
            Err(OtaError::TooLarge)
        );
        assert_eq!(flash.begun, 0);
    }

    #[test]
    fn test_truncated_download() {
        let ota = coordinator();
        let body = image(2_000);
        ota.submit_request(request_for(&body)).unwrap();
        let req = ota.try_next_request().unwrap();

        let mut http = MockHttp::ok(body).header("Content-Length", 4_000);
        let mut flash = MockFlash::default();

        assert_eq!(
            ota.run_update(&req, &mut http, &mut flash),
            Err(OtaError::Truncated)
        );
    }

    #[test]
    fn test_unknown_size_suppresses_progress() {
        let ota = coordinator();
        let body = image(9_000);
        ota.submit_request(request_for(&body)).unwrap();
        let req = ota.try_next_request().unwrap();

        let mut http = MockHttp::ok(body);
        let mut flash = MockFlash::default();
        ota.run_update(&req, &mut http, &mut flash).unwrap();
        assert_eq!(ota.status().state, OtaState::Success);
    }

    #[test]
    fn test_flash_write_failure() {
        let ota = coordinator();
        let body = image(1_000);
        ota.submit_request(request_for(&body)).unwrap();
        let req = ota.try_next_request().unwrap();

        let mut http = MockHttp::ok(body).with_length();
        let mut flash = MockFlash {
            fail_write: true,
            ..Default::default()
        };

        assert_eq!(
            ota.run_update(&req, &mut http, &mut flash),
            Err(OtaError::Flash(FlashError::Write))
        );
        assert_eq!(ota.status().state, OtaState::Failed);
    }

    #[test]
    fn test_change_notification() {
        let ota = coordinator();
        assert_eq!(block_on(ota.wait_for_change(Duration::from_millis(1))), None);

        ota.submit_request(request_for(b"abc")).unwrap();
        let seen = block_on(ota.wait_for_change(Duration::from_millis(100)));
        assert_eq!(seen.map(|s| s.state), Some(OtaState::Queued));
    }

    #[test]
    fn test_next_request_async() {
        let ota = coordinator();
        ota.submit_request(request_for(b"abc")).unwrap();

        let req = block_on(ota.next_request());
        assert_eq!(req.version.as_str(), "2.0");
        assert_eq!(ota.status().state, OtaState::InProgress);
    }

    #[test]
    fn test_next_request_sleeps_until_submit() {
        let ota = coordinator();
        let (counter, waker) = CountingWaker::new();
        let mut cx = Context::from_waker(&waker);

        let mut wait = pin!(ota.next_request());
        assert!(wait.as_mut().poll(&mut cx).is_pending());
        assert!(wait.as_mut().poll(&mut cx).is_pending());
        assert_eq!(counter.wakes(), 0);
        assert_eq!(ota.status().state, OtaState::Idle);

        ota.submit_request(request_for(b"abc")).unwrap();
        assert!(counter.wakes() >= 1);
        match wait.as_mut().poll(&mut cx) {
            Poll::Ready(req) => assert_eq!(req.version.as_str(), "2.0"),
            Poll::Pending => panic!("request not delivered after wake"),
        }
        assert_eq!(ota.status().state, OtaState::InProgress);
    }
}
