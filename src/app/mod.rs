//! Domain layer: port traits, outbound events, and the update service.

pub mod events;
pub mod ports;
pub mod service;
