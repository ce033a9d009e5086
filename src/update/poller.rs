//! Release poller.
//!
//! Fetches the published version string and decides whether an update is
//! due. Comparison is exact byte equality after trimming surrounding
//! whitespace — any difference, including case, counts as a new release.
//! There is deliberately no ordering: a remote string that is lexically
//! different but semantically older still triggers an install.

use log::{info, warn};

use crate::app::ports::Transport;
use crate::error::TransportError;

/// Result of one release poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Remote version equals the running version; nothing to do.
    NoChange,
    /// A differing version is published.
    UpdateAvailable { remote_version: String },
}

/// Polls the version resource and compares against the baked-in version.
pub struct ReleasePoller {
    current_version: &'static str,
}

impl ReleasePoller {
    pub fn new(current_version: &'static str) -> Self {
        Self { current_version }
    }

    /// Fetch the published version and compare it to the running one.
    ///
    /// Pure with respect to the slot store — installation is the caller's
    /// decision. A transport failure abandons this cycle; the next scheduled
    /// poll starts fresh.
    pub fn check(
        &self,
        transport: &mut impl Transport,
        version_url: &str,
    ) -> Result<CheckOutcome, TransportError> {
        let body = match transport.fetch_text(version_url) {
            Ok(b) => b,
            Err(e) => {
                warn!("Poller: version fetch failed — {}", e);
                return Err(e);
            }
        };
        let remote = body.trim();

        if remote == self.current_version {
            info!("Poller: up to date (v{})", self.current_version);
            Ok(CheckOutcome::NoChange)
        } else {
            info!(
                "Poller: new release '{}' (running '{}')",
                remote, self.current_version
            );
            Ok(CheckOutcome::UpdateAvailable {
                remote_version: remote.to_string(),
            })
        }
    }
}
