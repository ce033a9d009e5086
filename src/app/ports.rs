//! Port traits — the hexagonal boundary between the update controller and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ UpdateService (domain)
//! ```
//!
//! Driven adapters (HTTP transport, OTA slot store, NVS, restart hook)
//! implement these traits. The [`UpdateService`](super::service::UpdateService)
//! consumes them via generics, so the domain core never touches ESP-IDF
//! directly and runs unchanged on the host.

use crate::config::UpdateConfig;
use crate::error::{SlotError, TransportError};

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: network → domain)
// ───────────────────────────────────────────────────────────────

/// A readable byte source with a length declared up front.
///
/// Streams are single-pass: they cannot be rewound. To read the same
/// resource twice, open a second stream from the [`Transport`].
pub trait ByteStream {
    /// Total byte length declared by the server (Content-Length).
    fn declared_len(&self) -> u64;

    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// Read-side network port: fetch small text resources and open firmware
/// image streams.
pub trait Transport {
    type Stream: ByteStream;

    /// Fetch a resource as text. Fails on non-success HTTP status.
    fn fetch_text(&mut self, url: &str) -> Result<String, TransportError>;

    /// Open a resource as a fresh byte stream of declared length.
    fn open_stream(&mut self, url: &str) -> Result<Self::Stream, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Slot store port (driven adapter: domain → flash partitions)
// ───────────────────────────────────────────────────────────────

/// Boot-state tag of the running slot, maintained by the boot loader.
///
/// Read once at startup. The controller mutates it only through
/// [`SlotStore::mark_valid`], which moves `New`/`PendingVerify` → `Valid`.
/// `Aborted` and `Undefined` are read-only for the current boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    /// Image was just written; first boot has not been evaluated yet.
    New,
    /// Image booted with rollback enabled and awaits validation.
    PendingVerify,
    /// Image is confirmed permanent.
    Valid,
    /// Image failed validation on a previous boot and was rolled back.
    Aborted,
    /// The platform reports no state for this slot.
    Undefined,
}

/// Dual-slot flash interface.
///
/// The platform owns the actual flash geometry and enforces that only one
/// slot is ever bootable. The controller's obligation is narrower: never
/// call [`begin_write`](Self::begin_write) twice without an intervening
/// [`finalize`](Self::finalize) or [`abort`](Self::abort).
pub trait SlotStore {
    /// Open a write session of exactly `expected_len` bytes into the
    /// inactive slot. Refused with [`SlotError::InsufficientSpace`] if the
    /// slot cannot hold the image.
    fn begin_write(&mut self, expected_len: u64) -> Result<(), SlotError>;

    /// Append a chunk to the open session. Returns bytes accepted.
    fn write_chunk(&mut self, data: &[u8]) -> Result<usize, SlotError>;

    /// Close the session and mark the written image bootable.
    fn finalize(&mut self) -> Result<(), SlotError>;

    /// Drop the open session, leaving the inactive slot not bootable.
    /// Safe to call without a session.
    fn abort(&mut self);

    /// Boot-state tag of the currently running slot.
    fn boot_state(&self) -> BootState;

    /// Mark the running slot permanently valid (cancels rollback).
    fn mark_valid(&mut self) -> Result<(), SlotError>;
}

// ───────────────────────────────────────────────────────────────
// Restart port (driven adapter: domain → system reset)
// ───────────────────────────────────────────────────────────────

/// Requests a device restart after an install so the boot loader switches
/// to the freshly written slot.
pub trait RestartPort {
    /// Schedule a restart after `grace_ms` (time to flush logs).
    fn schedule_restart(&mut self, grace_ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, telnet,
/// a status LED, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate before persisting — invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`UpdateConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<UpdateConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &UpdateConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for crash logs and small blobs.
///
/// Keys are namespaced to prevent collisions between subsystems. Write
/// operations MUST be atomic — the ESP-IDF NVS API guarantees this
/// natively; the in-memory simulation achieves it trivially.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
