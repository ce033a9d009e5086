//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements       | Connects to                   |
//! |------------|------------------|-------------------------------|
//! | `http`     | Transport        | ESP-IDF HTTP client / sim map |
//! | `ota`      | SlotStore        | Dual app partitions / sim     |
//! | `nvs`      | ConfigPort       | NVS / in-memory store         |
//! |            | StoragePort      |                               |
//! | `restart`  | RestartPort      | `esp_restart()`               |
//! | `log_sink` | EventSink        | Serial log output             |
//! | `wifi`     | ConnectivityPort | ESP-IDF WiFi STA              |
//! | `time`     | (clock)          | ESP32 system timer            |
//! | `watchdog` | (TWDT)           | Task watchdog timer           |

pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod ota;
pub mod restart;
pub mod time;
pub mod watchdog;
pub mod wifi;
