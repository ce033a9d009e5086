//! Event sink adapter that writes controller events to the log.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::UpToDate => info!("update: firmware is current"),
            AppEvent::UpdateAvailable { remote_version } => {
                info!("update: new release '{}' published, installing", remote_version);
            }
            AppEvent::UpdateRejected(reason) => {
                warn!("update: image rejected — {}", reason);
            }
            AppEvent::UpdateFailed(err) => {
                error!("update: install failed — {}", err);
            }
            AppEvent::UpdateInstalled { remote_version } => {
                info!("update: '{}' installed, restart scheduled", remote_version);
            }
            AppEvent::SlotValidated => info!("rollback: running slot marked valid"),
            AppEvent::ValidationFailed(err) => {
                error!("rollback: mark-valid failed — {}", err);
            }
        }
    }
}
