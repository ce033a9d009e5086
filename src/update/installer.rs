//! Update installer — the two-phase download/verify/install pipeline.
//!
//! Flow: fetch digest → verify pass (hash only) → install pass (write) →
//! finalize → schedule restart.
//!
//! The image source cannot be rewound, so validating *before* committing
//! bytes to flash requires fetching the image twice: once disposably for
//! hashing, once for writing. That trades bandwidth for the invariant that
//! nothing reaches the inactive slot unless it already passed checksum
//! verification. Do not collapse this into a single pass unless the
//! transport guarantees replayable streams.

use log::{info, warn};

use crate::app::ports::{ByteStream, RestartPort, SlotStore, Transport};
use crate::error::{SlotError, UpdateError};
use crate::update::digest::digest_of;

/// Chunk size for the install pass (verify pass uses its own, smaller one).
const INSTALL_CHUNK: usize = 4096;

/// Why an image was refused without touching the slot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Computed digest of the downloaded image differs from the published one.
    ChecksumMismatch { expected: String, actual: String },
}

impl core::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

/// Terminal result of one install invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Image verified, written, finalized; restart scheduled.
    Installed,
    /// Image refused before the slot store was touched.
    Rejected(RejectReason),
}

/// Run one complete install attempt.
///
/// Every step is fatal-and-abort: there is no partial retry within one
/// invocation; the next polling cycle starts fresh. On success a restart is
/// scheduled through `restart` so the boot loader switches to the new slot.
pub fn install(
    transport: &mut impl Transport,
    slots: &mut impl SlotStore,
    restart: &mut impl RestartPort,
    firmware_url: &str,
    digest_url: &str,
    restart_grace_ms: u32,
) -> Result<InstallOutcome, UpdateError> {
    // 1. Published digest, normalised for case-insensitive comparison.
    let expected = transport
        .fetch_text(digest_url)
        .map_err(UpdateError::DigestUnavailable)?
        .trim()
        .to_ascii_lowercase();

    // 2–3. Verify pass: hash the full image without touching flash. The
    // stream is dropped at the end of this block whatever happens.
    let (image_len, actual) = {
        let mut stream = transport
            .open_stream(firmware_url)
            .map_err(UpdateError::ImageUnavailable)?;
        let len = stream.declared_len();
        let digest = digest_of(&mut stream, len)?;
        (len, digest)
    };

    // 4. Reject before write: a corrupt source must never reach the slot.
    if actual != expected {
        warn!(
            "Install: checksum mismatch (expected {}, got {}) — rejecting",
            expected, actual
        );
        return Ok(InstallOutcome::Rejected(RejectReason::ChecksumMismatch {
            expected,
            actual,
        }));
    }
    info!("Install: image verified ({} bytes), starting write pass", image_len);

    // 5. Fresh stream for the write pass; the verify stream is spent.
    let mut stream = transport
        .open_stream(firmware_url)
        .map_err(UpdateError::ImageUnavailable)?;

    slots.begin_write(image_len).map_err(|e| match e {
        SlotError::InsufficientSpace | SlotError::SessionActive => UpdateError::InsufficientSpace,
        other => other.into(),
    })?;

    // 6. Stream into the slot, chunk by chunk, counting accepted bytes.
    let mut written: u64 = 0;
    let mut buf = [0u8; INSTALL_CHUNK];
    while written < image_len {
        let remaining = image_len - written;
        let want = buf.len().min(remaining as usize);
        let n = match stream.read(&mut buf[..want]) {
            Ok(0) => break, // source dried up early; length check below
            Ok(n) => n,
            Err(e) => {
                slots.abort();
                return Err(UpdateError::ImageUnavailable(e));
            }
        };
        match slots.write_chunk(&buf[..n]) {
            Ok(accepted) => written += accepted as u64,
            Err(_) => {
                slots.abort();
                return Err(UpdateError::WriteFailed);
            }
        }
    }

    // 7. Exact length or nothing.
    if written != image_len {
        slots.abort();
        return Err(UpdateError::ShortWrite {
            expected: image_len,
            written,
        });
    }

    // 8. Finalize marks the slot bootable.
    if let Err(e) = slots.finalize() {
        let code = match e {
            SlotError::FinalizeFailed(c) => c,
            _ => -1,
        };
        return Err(UpdateError::FinalizeFailed(code));
    }

    // 9. Hand over to the boot loader after a short grace delay.
    info!(
        "Install: complete ({} bytes), restarting in {} ms",
        written, restart_grace_ms
    );
    restart.schedule_restart(restart_grace_ms);
    Ok(InstallOutcome::Installed)
}
