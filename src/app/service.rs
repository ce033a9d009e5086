//! Application service — the hexagonal core.
//!
//! [`UpdateService`] owns the release poller, rollback supervisor, and poll
//! cadence. One [`tick`](UpdateService::tick) is one iteration of the
//! scheduler loop: confirm the validation window if due, then poll for a
//! release if due, installing synchronously on a version mismatch. The
//! install blocks the loop for both download passes by design — that is
//! what guarantees at most one install in flight without any locking.
//!
//! ```text
//!  Transport ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                │       UpdateService        │
//!  SlotStore ◀── │  Poller · Installer ·      │ ──▶ RestartPort
//!                │  RollbackSupervisor        │
//!                └────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::UpdateConfig;
use crate::scheduler::Cadence;
use crate::update::installer::{self, InstallOutcome};
use crate::update::poller::{CheckOutcome, ReleasePoller};
use crate::update::rollback::RollbackSupervisor;

use super::events::AppEvent;
use super::ports::{EventSink, RestartPort, SlotStore, Transport};

/// Orchestrates the whole update/rollback lifecycle for one boot.
pub struct UpdateService {
    config: UpdateConfig,
    poller: ReleasePoller,
    supervisor: RollbackSupervisor,
    poll: Cadence,
}

impl UpdateService {
    /// Construct the service. Reads the persisted boot state (once) and
    /// arms the validation window when the running image is fresh.
    pub fn new(config: UpdateConfig, slots: &impl SlotStore, now_secs: u64) -> Self {
        let poller = ReleasePoller::new(crate::version::CURRENT);
        let supervisor =
            RollbackSupervisor::new(slots, now_secs, config.validation_timeout_secs);
        let poll = Cadence::new(config.poll_interval_secs);
        Self {
            config,
            poller,
            supervisor,
            poll,
        }
    }

    /// Whether the running image has been confirmed permanent.
    pub fn validated(&self) -> bool {
        self.supervisor.validated()
    }

    /// One scheduler-loop iteration.
    ///
    /// `health_ok` is the composition root's view of connectivity (WiFi
    /// link up). Polling is suppressed while the link is down; the
    /// validation window is evaluated every tick regardless so the
    /// supervisor can commit as soon as health returns.
    pub fn tick(
        &mut self,
        now_secs: u64,
        health_ok: bool,
        transport: &mut impl Transport,
        slots: &mut impl SlotStore,
        restart: &mut impl RestartPort,
        sink: &mut impl EventSink,
    ) {
        self.supervisor.tick(slots, now_secs, health_ok, sink);

        if !health_ok || !self.poll.due(now_secs) {
            return;
        }

        match self.poller.check(transport, &self.config.version_url) {
            Ok(CheckOutcome::NoChange) => sink.emit(&AppEvent::UpToDate),
            Ok(CheckOutcome::UpdateAvailable { remote_version }) => {
                sink.emit(&AppEvent::UpdateAvailable {
                    remote_version: remote_version.clone(),
                });
                // Synchronous and blocking: control does not return to the
                // loop until the attempt completes (success or failure).
                self.run_install(remote_version, transport, slots, restart, sink);
            }
            Err(e) => {
                warn!("Service: release poll failed — {}", e);
                sink.emit(&AppEvent::UpdateFailed(e.into()));
            }
        }
    }

    fn run_install(
        &mut self,
        remote_version: String,
        transport: &mut impl Transport,
        slots: &mut impl SlotStore,
        restart: &mut impl RestartPort,
        sink: &mut impl EventSink,
    ) {
        match installer::install(
            transport,
            slots,
            restart,
            &self.config.firmware_url,
            &self.config.digest_url,
            self.config.restart_grace_ms,
        ) {
            Ok(InstallOutcome::Installed) => {
                info!("Service: v{} installed", remote_version);
                sink.emit(&AppEvent::UpdateInstalled { remote_version });
            }
            Ok(InstallOutcome::Rejected(reason)) => {
                warn!("Service: update rejected — {}", reason);
                sink.emit(&AppEvent::UpdateRejected(reason));
            }
            Err(e) => {
                warn!("Service: install failed — {}", e);
                sink.emit(&AppEvent::UpdateFailed(e));
            }
        }
    }
}
