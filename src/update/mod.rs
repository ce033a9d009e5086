//! Update & rollback controller core.
//!
//! Four cooperating pieces, leaves first:
//!
//! - [`digest`] — streaming checksum verifier (constant memory).
//! - [`poller`] — release poller (exact-equality version check).
//! - [`installer`] — two-phase download/verify/install pipeline.
//! - [`rollback`] — post-boot validation window and slot commit.
//!
//! All of them speak only to port traits; nothing in this tree knows about
//! ESP-IDF.

pub mod digest;
pub mod installer;
pub mod poller;
pub mod rollback;
