//! Update controller configuration.
//!
//! All tunable parameters for polling, installation, and boot validation.
//! Values can be overridden via NVS (non-volatile storage); range validation
//! happens in the NVS adapter before anything is persisted.

use serde::{Deserialize, Serialize};

/// Core update controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    // --- Release source ---
    /// URL of the plain-text version resource.
    pub version_url: heapless::String<128>,
    /// URL of the firmware image (byte stream with declared length).
    pub firmware_url: heapless::String<128>,
    /// URL of the plain-text SHA-256 digest resource.
    pub digest_url: heapless::String<128>,

    // --- Timing ---
    /// Seconds between release polls.
    pub poll_interval_secs: u32,
    /// Scheduler loop quantum (milliseconds).
    pub tick_interval_ms: u32,
    /// Seconds a freshly booted image must soak before it is marked valid.
    /// Independent of the polling interval.
    pub validation_timeout_secs: u32,
    /// Grace delay before the post-install restart, to flush logs.
    pub restart_grace_ms: u32,
    /// HTTP request timeout (seconds).
    pub http_timeout_secs: u32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        let url = |s: &str| {
            let mut h = heapless::String::new();
            let _ = h.push_str(s);
            h
        };
        Self {
            version_url: url("http://192.168.1.208:8080/version.txt"),
            firmware_url: url("http://192.168.1.208:8080/firmware.bin"),
            digest_url: url("http://192.168.1.208:8080/firmware.sha256"),

            poll_interval_secs: 60,
            tick_interval_ms: 1000, // 1 Hz
            validation_timeout_secs: 60,
            restart_grace_ms: 3000,
            http_timeout_secs: 30,
        }
    }
}
