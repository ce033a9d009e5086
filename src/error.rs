//! Unified error types for the update controller.
//!
//! Follows embedded practice: small `Copy`-friendly enums per subsystem with
//! `Display` impls and `From` conversions into the top-level [`UpdateError`],
//! keeping the scheduler loop's error handling uniform. Every variant is
//! recoverable at the controller level — it aborts the current poll/install
//! cycle, leaves the running firmware untouched, and the whole attempt is
//! retried on the next scheduled poll.

use core::fmt;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Errors from the HTTP transport port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The server replied with a non-success HTTP status.
    Status(u16),
    /// The connection could not be established or dropped mid-transfer.
    Connection,
    /// A read from the response body failed.
    Io,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Connection => write!(f, "connection failed"),
            Self::Io => write!(f, "response read failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Slot store errors
// ---------------------------------------------------------------------------

/// Errors from the slot store port (inactive-slot write session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// The platform refused to open a write session of the requested length.
    InsufficientSpace,
    /// A chunk write into the inactive slot failed.
    WriteFailed,
    /// Finalize reported the image incomplete or invalid (platform code).
    FinalizeFailed(i32),
    /// Marking the running slot permanently valid failed (platform code).
    MarkValidFailed(i32),
    /// An operation required an open write session and none exists.
    NoSession,
    /// `begin_write` was called while a session is already open.
    SessionActive,
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientSpace => write!(f, "inactive slot refused write session"),
            Self::WriteFailed => write!(f, "slot chunk write failed"),
            Self::FinalizeFailed(code) => write!(f, "slot finalize failed (code {code})"),
            Self::MarkValidFailed(code) => write!(f, "mark-valid failed (code {code})"),
            Self::NoSession => write!(f, "no open slot write session"),
            Self::SessionActive => write!(f, "slot write session already open"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level update error
// ---------------------------------------------------------------------------

/// Every fallible step of the poll/install pipeline funnels into this type.
///
/// A digest mismatch is deliberately *not* here — it is an integrity
/// rejection, reported as an install outcome rather than an error (see
/// [`InstallOutcome`](crate::update::installer::InstallOutcome)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// Version resource fetch failed.
    Transport(TransportError),
    /// The digest resource could not be fetched.
    DigestUnavailable(TransportError),
    /// The firmware image could not be opened as a stream.
    ImageUnavailable(TransportError),
    /// A stream closed before yielding its declared byte length.
    TruncatedStream { expected: u64, read: u64 },
    /// The slot store refused to begin a write of the declared length.
    InsufficientSpace,
    /// A chunk write into the inactive slot failed mid-install.
    WriteFailed,
    /// Bytes streamed into the slot did not match the declared length.
    ShortWrite { expected: u64, written: u64 },
    /// The slot store reported the finalized image not complete.
    FinalizeFailed(i32),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::DigestUnavailable(e) => write!(f, "digest resource unavailable: {e}"),
            Self::ImageUnavailable(e) => write!(f, "firmware image unavailable: {e}"),
            Self::TruncatedStream { expected, read } => {
                write!(f, "stream truncated: {read} of {expected} bytes")
            }
            Self::InsufficientSpace => write!(f, "insufficient space in inactive slot"),
            Self::WriteFailed => write!(f, "slot write failed"),
            Self::ShortWrite { expected, written } => {
                write!(f, "short write: {written} of {expected} bytes")
            }
            Self::FinalizeFailed(code) => write!(f, "finalize failed (code {code})"),
        }
    }
}

impl From<TransportError> for UpdateError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<SlotError> for UpdateError {
    fn from(e: SlotError) -> Self {
        match e {
            SlotError::InsufficientSpace | SlotError::SessionActive => Self::InsufficientSpace,
            SlotError::WriteFailed | SlotError::NoSession => Self::WriteFailed,
            SlotError::FinalizeFailed(code) | SlotError::MarkValidFailed(code) => {
                Self::FinalizeFailed(code)
            }
        }
    }
}
