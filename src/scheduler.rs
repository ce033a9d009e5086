//! Poll cadence tracker.
//!
//! A minimal interval engine for the coarse scheduler loop: the main loop
//! ticks it with the current monotonic time and it answers whether the
//! periodic release poll is due. It is deliberately decoupled from both the
//! transport and the update service, which keeps it independently testable.
//!
//! The first call fires immediately — the controller checks for an update
//! at startup, then settles into the configured interval.

/// Fixed-interval cadence driven by monotonic seconds.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval_secs: u32,
    last_fire_secs: Option<u64>,
}

impl Cadence {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_secs,
            last_fire_secs: None,
        }
    }

    /// Returns `true` when the interval has elapsed (or on the very first
    /// call) and re-arms from `now_secs`.
    pub fn due(&mut self, now_secs: u64) -> bool {
        let fire = match self.last_fire_secs {
            None => true,
            Some(last) => now_secs.saturating_sub(last) >= u64::from(self.interval_secs),
        };
        if fire {
            self.last_fire_secs = Some(now_secs);
        }
        fire
    }

    /// Change the interval without disturbing the last-fire anchor.
    pub fn set_interval(&mut self, interval_secs: u32) {
        self.interval_secs = interval_secs;
    }
}
