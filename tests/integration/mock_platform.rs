//! Mock platform adapters for integration tests.
//!
//! Records every slot-store call so tests can assert on the full flash
//! command history, and serves canned HTTP responses with injectable
//! faults (bad status, truncated streams, mid-stream I/O errors).

use std::collections::HashMap;

use otaguard::app::events::AppEvent;
use otaguard::app::ports::{
    BootState, ByteStream, EventSink, RestartPort, SlotStore, Transport,
};
use otaguard::error::{SlotError, TransportError};

// ── Transport ─────────────────────────────────────────────────

#[derive(Clone)]
struct Resource {
    body: Vec<u8>,
    /// Overrides `body.len()` when set, to simulate a server that
    /// declares more bytes than it delivers.
    declared_len: Option<u64>,
    status: u16,
    /// Stream read calls fail after this many bytes were served, but only
    /// from the Nth open of this resource onward (1-based).
    fail_after: Option<(u32, usize)>,
    opens: u32,
}

pub struct MockTransport {
    resources: HashMap<String, Resource>,
    pub fetch_count: u32,
    pub stream_count: u32,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
            fetch_count: 0,
            stream_count: 0,
        }
    }

    pub fn put(&mut self, url: &str, body: impl Into<Vec<u8>>) {
        self.resources.insert(
            url.to_owned(),
            Resource {
                body: body.into(),
                declared_len: None,
                status: 200,
                fail_after: None,
                opens: 0,
            },
        );
    }

    pub fn put_status(&mut self, url: &str, status: u16) {
        if let Some(r) = self.resources.get_mut(url) {
            r.status = status;
        } else {
            self.resources.insert(
                url.to_owned(),
                Resource {
                    body: Vec::new(),
                    declared_len: None,
                    status,
                    fail_after: None,
                    opens: 0,
                },
            );
        }
    }

    /// Declare `declared_len` but only serve the stored body.
    pub fn put_truncated(&mut self, url: &str, body: impl Into<Vec<u8>>, declared_len: u64) {
        self.resources.insert(
            url.to_owned(),
            Resource {
                body: body.into(),
                declared_len: Some(declared_len),
                status: 200,
                fail_after: None,
                opens: 0,
            },
        );
    }

    /// From the `from_nth` open of `url` onward (1-based), stream reads
    /// return `TransportError::Io` once `fail_after` bytes have been served.
    pub fn fail_stream_after(&mut self, url: &str, from_nth: u32, fail_after: usize) {
        if let Some(r) = self.resources.get_mut(url) {
            r.fail_after = Some((from_nth, fail_after));
        }
    }

    fn lookup(&mut self, url: &str) -> Result<Resource, TransportError> {
        let r = self
            .resources
            .get_mut(url)
            .ok_or(TransportError::Status(404))?;
        if !(200..300).contains(&r.status) {
            return Err(TransportError::Status(r.status));
        }
        Ok(r.clone())
    }
}

pub struct MockStream {
    body: Vec<u8>,
    pos: usize,
    declared_len: u64,
    fail_after: Option<usize>,
}

impl ByteStream for MockStream {
    fn declared_len(&self) -> u64 {
        self.declared_len
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let remaining = &self.body[self.pos..];
        let mut n = remaining.len().min(buf.len());
        if let Some(limit) = self.fail_after {
            if self.pos >= limit {
                return Err(TransportError::Io);
            }
            n = n.min(limit - self.pos);
        }
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Transport for MockTransport {
    type Stream = MockStream;

    fn fetch_text(&mut self, url: &str) -> Result<String, TransportError> {
        self.fetch_count += 1;
        let r = self.lookup(url)?;
        String::from_utf8(r.body).map_err(|_| TransportError::Io)
    }

    fn open_stream(&mut self, url: &str) -> Result<Self::Stream, TransportError> {
        self.stream_count += 1;
        let r = self.lookup(url)?;
        let nth = {
            let stored = self.resources.get_mut(url).expect("resource vanished");
            stored.opens += 1;
            stored.opens
        };
        let declared_len = r.declared_len.unwrap_or(r.body.len() as u64);
        let fail_after = match r.fail_after {
            Some((from_nth, at)) if nth >= from_nth => Some(at),
            _ => None,
        };
        Ok(MockStream {
            body: r.body,
            pos: 0,
            declared_len,
            fail_after,
        })
    }
}

// ── Slot store (records every call) ───────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotCall {
    BeginWrite(u64),
    WriteChunk(usize),
    Finalize,
    Abort,
    MarkValid,
}

pub struct MockSlotStore {
    pub calls: Vec<SlotCall>,
    pub boot_state: BootState,
    written: Vec<u8>,
    session: Option<u64>,
    finalized: Option<Vec<u8>>,
    // Failure injection.
    pub refuse_begin: bool,
    pub accept_at_most: Option<usize>,
    pub fail_finalize_code: Option<i32>,
    pub fail_mark_valid_code: Option<i32>,
}

#[allow(dead_code)]
impl MockSlotStore {
    pub fn new() -> Self {
        Self::with_boot_state(BootState::Valid)
    }

    pub fn with_boot_state(boot_state: BootState) -> Self {
        Self {
            calls: Vec::new(),
            boot_state,
            written: Vec::new(),
            session: None,
            finalized: None,
            refuse_begin: false,
            accept_at_most: None,
            fail_finalize_code: None,
            fail_mark_valid_code: None,
        }
    }

    /// True if no write-path call ever reached the store.
    pub fn untouched(&self) -> bool {
        !self.calls.iter().any(|c| {
            matches!(
                c,
                SlotCall::BeginWrite(_) | SlotCall::WriteChunk(_) | SlotCall::Finalize
            )
        })
    }

    pub fn finalized_image(&self) -> Option<&[u8]> {
        self.finalized.as_deref()
    }

    pub fn mark_valid_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SlotCall::MarkValid))
            .count()
    }
}

impl SlotStore for MockSlotStore {
    fn begin_write(&mut self, expected_len: u64) -> Result<(), SlotError> {
        self.calls.push(SlotCall::BeginWrite(expected_len));
        if self.session.is_some() {
            return Err(SlotError::SessionActive);
        }
        if self.refuse_begin {
            return Err(SlotError::InsufficientSpace);
        }
        self.session = Some(expected_len);
        self.written.clear();
        Ok(())
    }

    fn write_chunk(&mut self, data: &[u8]) -> Result<usize, SlotError> {
        self.calls.push(SlotCall::WriteChunk(data.len()));
        if self.session.is_none() {
            return Err(SlotError::NoSession);
        }
        let mut accept = data.len();
        if let Some(limit) = self.accept_at_most {
            accept = accept.min(limit.saturating_sub(self.written.len()));
        }
        self.written.extend_from_slice(&data[..accept]);
        Ok(accept)
    }

    fn finalize(&mut self) -> Result<(), SlotError> {
        self.calls.push(SlotCall::Finalize);
        let Some(expected) = self.session.take() else {
            return Err(SlotError::NoSession);
        };
        if let Some(code) = self.fail_finalize_code {
            return Err(SlotError::FinalizeFailed(code));
        }
        if self.written.len() as u64 != expected {
            return Err(SlotError::FinalizeFailed(-1));
        }
        self.finalized = Some(std::mem::take(&mut self.written));
        Ok(())
    }

    fn abort(&mut self) {
        self.calls.push(SlotCall::Abort);
        self.session = None;
        self.written.clear();
    }

    fn boot_state(&self) -> BootState {
        self.boot_state
    }

    fn mark_valid(&mut self) -> Result<(), SlotError> {
        self.calls.push(SlotCall::MarkValid);
        if let Some(code) = self.fail_mark_valid_code {
            return Err(SlotError::MarkValidFailed(code));
        }
        self.boot_state = BootState::Valid;
        Ok(())
    }
}

// ── Restart port ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockRestart {
    pub requests: Vec<u32>,
}

#[allow(dead_code)]
impl MockRestart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> bool {
        !self.requests.is_empty()
    }
}

impl RestartPort for MockRestart {
    fn schedule_restart(&mut self, grace_ms: u32) {
        self.requests.push(grace_ms);
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_installed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::UpdateInstalled { .. }))
            .count()
    }

    pub fn count_validated(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::SlotValidated))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
