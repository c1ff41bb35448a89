//! Update intake endpoints
//!
//! - `POST /ota` accepts `{"url", "md5", "version"?, "size"?}` and queues
//!   the update without waiting for it to run
//! - `GET /ota/status` reports the current update state and progress

use embedded_svc::http::{Headers, Method};
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use log::{info, warn};

use tessera_core::ota::{OtaCoordinator, OtaError};
use tessera_protocol::{ErrorReply, MAX_INVITE_SIZE};

use crate::channels::DeviceMutex;

const JSON_HEADERS: &[(&str, &str)] = &[("Content-Type", "application/json; charset=utf-8")];

const QUEUED_REPLY: &[u8] = br#"{"status":"QUEUED"}"#;

type HttpRequest<'r, 'c> = Request<&'r mut EspHttpConnection<'c>>;

/// Why a request body could not be read
enum BodyError {
    TooLarge,
    Io,
}

/// Start the intake server
pub fn create_ota_server(
    ota: &'static OtaCoordinator<DeviceMutex>,
    port: u16,
) -> anyhow::Result<EspHttpServer<'static>> {
    let conf = Configuration {
        http_port: port,
        stack_size: 10 * 1024,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    server.fn_handler::<anyhow::Error, _>("/ota", Method::Post, move |mut req| {
        let body = match read_request_body(&mut req) {
            Ok(body) => body,
            Err(BodyError::TooLarge) => return write_error(req, 413, "request body too large"),
            Err(BodyError::Io) => return write_error(req, 400, "failed to read request body"),
        };

        match ota.submit_json(&body) {
            Ok(()) => {
                info!("OTA request queued");
                write_json(req, 202, QUEUED_REPLY)
            }
            Err(OtaError::Busy) => write_error(req, 409, "update already in progress"),
            Err(e) => {
                warn!("OTA request rejected: {}", e);
                let message = e.to_string();
                write_error(req, 400, &message)
            }
        }
    })?;

    server.fn_handler::<anyhow::Error, _>("/ota/status", Method::Get, move |req| {
        let body = ota.status().report().to_json()?;
        write_json(req, 200, &body)
    })?;

    info!("OTA server listening on port {}", port);
    Ok(server)
}

fn read_request_body(req: &mut HttpRequest<'_, '_>) -> Result<Vec<u8>, BodyError> {
    let declared = req.content_len().unwrap_or(0) as usize;
    if declared > MAX_INVITE_SIZE {
        return Err(BodyError::TooLarge);
    }

    let mut body = vec![0u8; declared];
    if declared > 0 {
        req.read_exact(&mut body).map_err(|_| BodyError::Io)?;
        return Ok(body);
    }

    // No declared length: read up to the limit, one byte past it means too large
    body.resize(MAX_INVITE_SIZE + 1, 0);
    let mut filled = 0;
    while filled < body.len() {
        let n = req.read(&mut body[filled..]).map_err(|_| BodyError::Io)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled > MAX_INVITE_SIZE {
        return Err(BodyError::TooLarge);
    }
    body.truncate(filled);
    Ok(body)
}

fn write_json(req: HttpRequest<'_, '_>, status: u16, body: &[u8]) -> anyhow::Result<()> {
    req.into_response(status, None, JSON_HEADERS)?
        .write_all(body)?;
    Ok(())
}

fn write_error(req: HttpRequest<'_, '_>, status: u16, message: &str) -> anyhow::Result<()> {
    let body = ErrorReply::new(message).to_json()?;
    write_json(req, status, &body)
}
