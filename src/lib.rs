//! OtaGuard firmware update controller library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod scheduler;
pub mod update;
pub mod version;

// Adapter implementations are cfg-guarded internally; the host gets
// in-memory simulation backends behind the same types.
pub mod adapters;
