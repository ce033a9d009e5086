//! Outbound application events.
//!
//! The [`UpdateService`](super::service::UpdateService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, drive a status LED,
//! publish to a monitoring endpoint, etc.

use crate::error::{SlotError, UpdateError};
use crate::update::installer::RejectReason;

/// Structured events emitted by the update controller core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A release poll ran and the remote version matched the running one.
    UpToDate,

    /// A differing remote version was published; an install is starting.
    UpdateAvailable { remote_version: String },

    /// The downloaded image failed integrity verification and was refused
    /// before anything touched the inactive slot.
    UpdateRejected(RejectReason),

    /// An install attempt aborted with an error; it will be retried
    /// wholesale on the next scheduled poll.
    UpdateFailed(UpdateError),

    /// The image was verified, written, and finalized; a restart is
    /// scheduled so the boot loader switches slots.
    UpdateInstalled { remote_version: String },

    /// The running slot was marked permanently valid.
    SlotValidated,

    /// Marking the running slot valid failed; no retry this boot.
    ValidationFailed(SlotError),
}
