//! Restart adapter.
//!
//! A successful install ends with a reboot into the freshly written slot.
//! The grace delay gives the log sink time to flush the final messages
//! over serial before the reset.

use log::info;

use crate::app::ports::RestartPort;

pub struct SystemRestart;

impl SystemRestart {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRestart {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl RestartPort for SystemRestart {
    fn schedule_restart(&mut self, grace_ms: u32) {
        info!("restart: rebooting in {} ms", grace_ms);
        std::thread::sleep(core::time::Duration::from_millis(u64::from(grace_ms)));
        unsafe { esp_idf_svc::sys::esp_restart() };
    }
}

#[cfg(not(target_os = "espidf"))]
impl RestartPort for SystemRestart {
    fn schedule_restart(&mut self, grace_ms: u32) {
        info!("restart(sim): reboot requested (grace {} ms)", grace_ms);
    }
}
