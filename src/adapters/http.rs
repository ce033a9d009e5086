//! HTTP transport adapter.
//!
//! Implements [`Transport`] on the ESP-IDF HTTP client. Each
//! [`open_stream`](Transport::open_stream) opens a dedicated connection
//! that the returned [`HttpStream`] owns, so a verify pass and an install
//! pass never share socket state.
//!
//! The host backend serves responses from an in-memory resource map,
//! which the integration tests seed directly.

use log::{debug, warn};

use crate::app::ports::{ByteStream, Transport};
use crate::error::TransportError;

/// Upper bound for text resources (version strings, digest files).
const MAX_TEXT_LEN: usize = 1024;

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod backend {
    use super::*;
    use embedded_svc::http::client::Connection;
    use embedded_svc::http::Method;
    use embedded_svc::io::Read;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

    pub struct HttpTransport {
        timeout_secs: u32,
    }

    impl HttpTransport {
        pub fn new(timeout_secs: u32) -> Self {
            Self { timeout_secs }
        }

        fn open(&self, url: &str) -> Result<(EspHttpConnection, u64), TransportError> {
            let config = Configuration {
                timeout: Some(core::time::Duration::from_secs(u64::from(self.timeout_secs))),
                ..Default::default()
            };
            let mut conn =
                EspHttpConnection::new(&config).map_err(|_| TransportError::Connection)?;

            conn.initiate_request(Method::Get, url, &[])
                .map_err(|_| TransportError::Connection)?;
            conn.initiate_response()
                .map_err(|_| TransportError::Connection)?;

            let status = conn.status();
            if !(200..300).contains(&status) {
                return Err(TransportError::Status(status));
            }

            let declared_len = conn
                .header("Content-Length")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0);

            Ok((conn, declared_len))
        }
    }

    pub struct HttpStream {
        conn: EspHttpConnection,
        declared_len: u64,
    }

    impl ByteStream for HttpStream {
        fn declared_len(&self) -> u64 {
            self.declared_len
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            self.conn.read(buf).map_err(|_| TransportError::Io)
        }
    }

    impl Transport for HttpTransport {
        type Stream = HttpStream;

        fn fetch_text(&mut self, url: &str) -> Result<String, TransportError> {
            let (mut conn, declared_len) = self.open(url)?;
            if declared_len as usize > MAX_TEXT_LEN {
                warn!("http: text resource too large ({} bytes)", declared_len);
                return Err(TransportError::Io);
            }

            let mut body = Vec::new();
            let mut chunk = [0u8; 128];
            loop {
                let n = conn.read(&mut chunk).map_err(|_| TransportError::Io)?;
                if n == 0 {
                    break;
                }
                if body.len() + n > MAX_TEXT_LEN {
                    return Err(TransportError::Io);
                }
                body.extend_from_slice(&chunk[..n]);
            }

            String::from_utf8(body).map_err(|_| TransportError::Io)
        }

        fn open_stream(&mut self, url: &str) -> Result<Self::Stream, TransportError> {
            let (conn, declared_len) = self.open(url)?;
            debug!("http: stream open, {} bytes declared", declared_len);
            Ok(HttpStream { conn, declared_len })
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod backend {
    use super::*;
    use std::collections::HashMap;

    /// Serves canned responses keyed by URL. Tests seed it with
    /// [`put_resource`](HttpTransport::put_resource) and can force a
    /// status code per URL with [`put_status`](HttpTransport::put_status).
    pub struct HttpTransport {
        resources: HashMap<String, Vec<u8>>,
        statuses: HashMap<String, u16>,
    }

    impl HttpTransport {
        pub fn new(_timeout_secs: u32) -> Self {
            Self {
                resources: HashMap::new(),
                statuses: HashMap::new(),
            }
        }

        pub fn put_resource(&mut self, url: &str, body: impl Into<Vec<u8>>) {
            self.resources.insert(url.to_owned(), body.into());
        }

        pub fn put_status(&mut self, url: &str, status: u16) {
            self.statuses.insert(url.to_owned(), status);
        }

        fn lookup(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            if let Some(&status) = self.statuses.get(url) {
                if !(200..300).contains(&status) {
                    return Err(TransportError::Status(status));
                }
            }
            self.resources
                .get(url)
                .cloned()
                .ok_or(TransportError::Status(404))
        }
    }

    pub struct HttpStream {
        body: Vec<u8>,
        pos: usize,
        declared_len: u64,
    }

    impl ByteStream for HttpStream {
        fn declared_len(&self) -> u64 {
            self.declared_len
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            let remaining = &self.body[self.pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Transport for HttpTransport {
        type Stream = HttpStream;

        fn fetch_text(&mut self, url: &str) -> Result<String, TransportError> {
            let body = self.lookup(url)?;
            if body.len() > MAX_TEXT_LEN {
                warn!("http(sim): text resource too large ({} bytes)", body.len());
                return Err(TransportError::Io);
            }
            String::from_utf8(body).map_err(|_| TransportError::Io)
        }

        fn open_stream(&mut self, url: &str) -> Result<Self::Stream, TransportError> {
            let body = self.lookup(url)?;
            let declared_len = body.len() as u64;
            debug!("http(sim): stream open, {} bytes declared", declared_len);
            Ok(HttpStream {
                body,
                pos: 0,
                declared_len,
            })
        }
    }
}

pub use backend::{HttpStream, HttpTransport};

// ───────────────────────────────────────────────────────────────
// Tests (host backend)
// ───────────────────────────────────────────────────────────────
