//! Crash logging.
//!
//! Stores up to 4 crash entries in an NVS ring buffer under the "crash"
//! namespace. Each entry captures the firmware version, uptime, and a
//! truncated panic reason. A panic hook writes the entry before the
//! system resets, so a crash loop in a fresh image leaves evidence the
//! rollback can be correlated with after the boot loader reverts.

use serde::{Deserialize, Serialize};

const CRASH_RING_SLOTS: usize = 4;
const CRASH_NAMESPACE: &str = "crash";
const CRASH_INDEX_KEY: &str = "idx";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashEntry {
    pub fw_version: heapless::String<24>,
    pub uptime_secs: u64,
    pub reason: heapless::String<64>,
}

impl CrashEntry {
    pub fn new(uptime_secs: u64, reason: &str) -> Self {
        let mut v = heapless::String::new();
        let _ = v.push_str(truncate_str(crate::version::CURRENT, 23));
        let mut r = heapless::String::new();
        let _ = r.push_str(truncate_str(reason, 63));
        Self {
            fw_version: v,
            uptime_secs,
            reason: r,
        }
    }
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
/// Runs inside the panic hook, so it must never itself panic.
fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// NVS-backed ring buffer for crash entries.
#[derive(Default)]
pub struct CrashLog {
    write_index: usize,
}

impl CrashLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the write index from NVS, or default to 0.
    pub fn init(&mut self, nvs: &dyn crate::app::ports::StoragePort) {
        let mut buf = [0u8; 4];
        if let Ok(4) = nvs.read(CRASH_NAMESPACE, CRASH_INDEX_KEY, &mut buf) {
            self.write_index = u32::from_le_bytes(buf) as usize % CRASH_RING_SLOTS;
        }
    }

    /// Write a crash entry to the next ring slot and advance the index.
    pub fn write_entry(
        &mut self,
        nvs: &mut dyn crate::app::ports::StoragePort,
        entry: &CrashEntry,
    ) {
        let slot_key = Self::slot_key(self.write_index);
        if let Ok(bytes) = postcard::to_allocvec(entry) {
            let _ = nvs.write(CRASH_NAMESPACE, &slot_key, &bytes);
        }

        self.write_index = (self.write_index + 1) % CRASH_RING_SLOTS;
        let idx_bytes = (self.write_index as u32).to_le_bytes();
        let _ = nvs.write(CRASH_NAMESPACE, CRASH_INDEX_KEY, &idx_bytes);
    }

    /// Read all stored crash entries (up to 4).
    pub fn read_all(
        &self,
        nvs: &dyn crate::app::ports::StoragePort,
    ) -> heapless::Vec<CrashEntry, 4> {
        let mut entries = heapless::Vec::new();
        for i in 0..CRASH_RING_SLOTS {
            let slot_key = Self::slot_key(i);
            let mut buf = [0u8; 256];
            if let Ok(len) = nvs.read(CRASH_NAMESPACE, &slot_key, &mut buf) {
                if let Ok(entry) = postcard::from_bytes::<CrashEntry>(&buf[..len]) {
                    let _ = entries.push(entry);
                }
            }
        }
        entries
    }

    /// Erase all crash entries and reset the index.
    pub fn clear(&mut self, nvs: &mut dyn crate::app::ports::StoragePort) {
        for i in 0..CRASH_RING_SLOTS {
            let _ = nvs.delete(CRASH_NAMESPACE, &Self::slot_key(i));
        }
        let _ = nvs.delete(CRASH_NAMESPACE, CRASH_INDEX_KEY);
        self.write_index = 0;
    }

    pub fn count(&self, nvs: &dyn crate::app::ports::StoragePort) -> usize {
        (0..CRASH_RING_SLOTS)
            .filter(|i| nvs.exists(CRASH_NAMESPACE, &Self::slot_key(*i)))
            .count()
    }

    fn slot_key(index: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("e{}", index));
        s
    }
}

// ───────────────────────────────────────────────────────────────
// Panic hook — writes a CrashEntry to NVS before reset
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that persists crash info to NVS.
///
/// Must be called once during init, after NVS is ready. A crash during
/// the validation window is exactly the case the rollback supervisor
/// exists for; the persisted entry tells the next boot what happened.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };

        log::error!("PANIC: {}", reason);

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: esp_timer_get_time is a plain counter read, safe in
            // panic context (no allocation, no locks).
            let uptime = (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000_000;
            let entry = CrashEntry::new(uptime, reason);

            // If NVS was never initialised the write fails silently; we do
            // not call nvs_flash_init() from panic context.
            match crate::adapters::nvs::NvsAdapter::new() {
                Ok(mut nvs) => {
                    let mut crash_log = CrashLog::new();
                    crash_log.init(&nvs);
                    crash_log.write_entry(&mut nvs, &entry);
                }
                Err(_) => {
                    log::error!("Panic handler: NVS unavailable — crash entry not persisted");
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::error!("Crash entry (simulation): {}", reason);
        }
    }));
}
