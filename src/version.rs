//! Build-time firmware identity.
//!
//! The running version is baked in at compile time and compared against the
//! remote version string by exact byte equality only — there is no ordering
//! or semantic-versioning logic anywhere in the controller.

/// Version identifier of the firmware currently running.
pub const CURRENT: &str = env!("CARGO_PKG_VERSION");

/// One-line identity string for the boot banner and remote reporting.
pub fn banner() -> heapless::String<64> {
    let mut s = heapless::String::new();
    let _ = core::fmt::Write::write_fmt(
        &mut s,
        format_args!("{} v{}", env!("CARGO_PKG_NAME"), CURRENT),
    );
    s
}
