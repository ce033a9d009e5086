//! Rollback supervisor — boot-state validation state machine.
//!
//! ```text
//!            boot
//!             │ read boot_state()
//!   ┌─────────┼──────────────┐
//!   ▼         ▼              ▼
//! Valid   New/PendingVerify  Aborted/Undefined
//!   │         │ arm window          │ informational only
//!   done      ▼
//!        window elapsed + health ok
//!             │ mark_valid() (once)
//!             ▼
//!          validated
//! ```
//!
//! If health is never confirmed, this component takes no corrective action:
//! the boot loader reverts to the previous slot on the next reset as long as
//! the image was never marked valid. The supervisor's obligations are only
//! to never mark an image valid while health is unconfirmed, and to never
//! re-issue a mark-valid that already succeeded.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{BootState, EventSink, SlotStore};

/// Bounded post-boot soak period before the running image may be committed.
#[derive(Debug, Clone, Copy)]
pub struct ValidationWindow {
    /// Monotonic seconds at which the window was armed (boot time).
    pub armed_at_secs: u64,
    /// Soak duration; independent of the release-poll interval.
    pub timeout_secs: u32,
}

impl ValidationWindow {
    pub fn elapsed(&self, now_secs: u64) -> bool {
        now_secs.saturating_sub(self.armed_at_secs) >= u64::from(self.timeout_secs)
    }
}

/// Owns the validated flag and the single mark-valid attempt per boot.
pub struct RollbackSupervisor {
    boot_state: BootState,
    window: Option<ValidationWindow>,
    validated: bool,
    attempted: bool,
}

impl RollbackSupervisor {
    /// Read the persisted boot state once and arm the window if the image
    /// is fresh.
    pub fn new(slots: &impl SlotStore, now_secs: u64, timeout_secs: u32) -> Self {
        let boot_state = slots.boot_state();
        let (window, validated) = match boot_state {
            BootState::Valid => {
                info!("Rollback: image already valid");
                (None, true)
            }
            BootState::New | BootState::PendingVerify => {
                info!(
                    "Rollback: {:?} image, arming {}s validation window",
                    boot_state, timeout_secs
                );
                (
                    Some(ValidationWindow {
                        armed_at_secs: now_secs,
                        timeout_secs,
                    }),
                    false,
                )
            }
            BootState::Aborted | BootState::Undefined => {
                // Terminal for this boot; nothing to arm, nothing to mark.
                warn!("Rollback: boot state {:?}, no validation possible", boot_state);
                (None, false)
            }
        };
        Self {
            boot_state,
            window,
            validated,
            attempted: false,
        }
    }

    /// Boot state as read at startup.
    pub fn boot_state(&self) -> BootState {
        self.boot_state
    }

    /// Whether the running image is confirmed permanent.
    pub fn validated(&self) -> bool {
        self.validated
    }

    /// One scheduler tick: commit the running slot if the soak window has
    /// elapsed and health is confirmed.
    ///
    /// Idempotent after success — once `validated` flips true it is never
    /// reset and `mark_valid` is never re-invoked. A failed mark is reported
    /// once and not retried this boot; the next boot re-evaluates from the
    /// persisted state.
    pub fn tick(
        &mut self,
        slots: &mut impl SlotStore,
        now_secs: u64,
        health_ok: bool,
        sink: &mut impl EventSink,
    ) {
        if self.validated || self.attempted {
            return;
        }
        let Some(window) = self.window else {
            return;
        };
        if !window.elapsed(now_secs) || !health_ok {
            return;
        }

        self.attempted = true;
        match slots.mark_valid() {
            Ok(()) => {
                self.validated = true;
                info!("Rollback: running slot marked valid (rollback cancelled)");
                sink.emit(&AppEvent::SlotValidated);
            }
            Err(e) => {
                warn!("Rollback: mark-valid failed — {}", e);
                sink.emit(&AppEvent::ValidationFailed(e));
            }
        }
    }
}
