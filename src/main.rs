//! OtaGuard — Main Entry Point
//!
//! Resident firmware-update controller for a dual-slot ESP32-S3 device.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                   │
//! │                                                              │
//! │  HttpTransport   EspSlotStore   NvsAdapter    SystemRestart  │
//! │  (Transport)     (SlotStore)    (Config+NVS)  (RestartPort)  │
//! │  WifiAdapter     LogEventSink   MonotonicClock               │
//! │  (Connectivity)  (EventSink)    (uptime)                     │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ──────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            UpdateService (pure logic)                  │  │
//! │  │  ReleasePoller · Installer · RollbackSupervisor        │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use otaguard::adapters::http::HttpTransport;
use otaguard::adapters::log_sink::LogEventSink;
use otaguard::adapters::nvs::NvsAdapter;
use otaguard::adapters::ota::EspSlotStore;
use otaguard::adapters::restart::SystemRestart;
use otaguard::adapters::time::MonotonicClock;
use otaguard::adapters::watchdog::Watchdog;
use otaguard::adapters::wifi::{ConnectivityPort, WifiAdapter};
use otaguard::app::ports::ConfigPort;
use otaguard::app::service::UpdateService;
use otaguard::config::UpdateConfig;
use otaguard::{diagnostics, version};

// Baked in at build time; provisioning over BLE or serial is a later
// iteration, the deployment fleet shares one maintenance SSID.
const WIFI_SSID: &str = match option_env!("OTAGUARD_WIFI_SSID") {
    Some(s) => s,
    None => "lab-net",
};
const WIFI_PASS: &str = match option_env!("OTAGUARD_WIFI_PASS") {
    Some(s) => s,
    None => "lab-net-password",
};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("{}", version::banner());

    // ── 2. Persistence + crash diagnostics ────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            None
        }
    };
    diagnostics::install_panic_handler();

    let config = match nvs.as_ref().map(|n| n.load()) {
        Some(Ok(cfg)) => {
            info!("Config loaded from NVS");
            cfg
        }
        Some(Err(e)) => {
            warn!("NVS config load failed ({}), using defaults", e);
            UpdateConfig::default()
        }
        None => UpdateConfig::default(),
    };

    if let Some(nvs) = nvs.as_mut() {
        let mut crash_log = diagnostics::CrashLog::new();
        crash_log.init(nvs);
        let count = crash_log.count(nvs);
        if count > 0 {
            warn!("{} crash entr{} recorded on previous boots", count, if count == 1 { "y" } else { "ies" });
            for entry in crash_log.read_all(nvs) {
                warn!(
                    "  crash: v{} after {}s uptime: {}",
                    entry.fw_version, entry.uptime_secs, entry.reason
                );
            }
        }
    }

    // ── 3. Watchdog ───────────────────────────────────────────
    let watchdog = Watchdog::new();

    // ── 4. Connectivity ───────────────────────────────────────
    let mut wifi = WifiAdapter::new();
    if let Err(e) = wifi.set_credentials(WIFI_SSID, WIFI_PASS) {
        warn!("WiFi credentials rejected: {}", e);
    }
    if let Err(e) = wifi.connect() {
        // Not fatal: the poll loop keeps retrying with backoff, and the
        // rollback window simply waits for health to return.
        warn!("Initial WiFi connect failed: {}", e);
    }

    // ── 5. Construct adapters + service ───────────────────────
    let clock = MonotonicClock::new();
    let mut transport = HttpTransport::new(config.http_timeout_secs);
    let mut slots = EspSlotStore::new();
    let mut restart = SystemRestart::new();
    let mut sink = LogEventSink::new();

    let tick_interval_ms = config.tick_interval_ms;
    let mut service = UpdateService::new(config, &slots, clock.uptime_secs());

    info!("System ready. Entering scheduler loop.");

    // ── 6. Scheduler loop ─────────────────────────────────────
    // Single-threaded coarse polling. An install blocks this loop for
    // both download passes; the TWDT window is sized accordingly.
    let mut last_rssi_report: u64 = 0;
    loop {
        std::thread::sleep(core::time::Duration::from_millis(u64::from(
            tick_interval_ms,
        )));

        wifi.poll();
        let now = clock.uptime_secs();

        // Link health once a minute, mirrors the poll cadence.
        if wifi.is_connected() && now.saturating_sub(last_rssi_report) >= 60 {
            if let Some(rssi) = wifi.rssi() {
                info!("WiFi RSSI: {} dBm", rssi);
            }
            last_rssi_report = now;
        }

        service.tick(
            now,
            wifi.is_connected(),
            &mut transport,
            &mut slots,
            &mut restart,
            &mut sink,
        );

        watchdog.feed();
    }
}
