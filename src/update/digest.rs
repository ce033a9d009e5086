//! Streaming checksum verifier.
//!
//! Feeds a [`ByteStream`] through an incremental SHA-256 in small fixed
//! chunks, so peak memory stays constant regardless of image size. The whole
//! image is never buffered.

use sha2::{Digest, Sha256};

use crate::app::ports::ByteStream;
use crate::error::UpdateError;

/// Read chunk for hashing. Small on purpose — the verify pass competes with
/// the WiFi stack for RAM.
const HASH_CHUNK: usize = 512;

/// Consume `declared_len` bytes from `stream` and return the lowercase hex
/// SHA-256 digest.
///
/// A stream that ends before `declared_len` is [`UpdateError::TruncatedStream`].
/// Bytes beyond `declared_len` are never requested. `declared_len == 0` is a
/// legitimate degenerate image and yields the empty-input digest.
pub fn digest_of(
    stream: &mut impl ByteStream,
    declared_len: u64,
) -> Result<String, UpdateError> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK];
    let mut consumed: u64 = 0;

    while consumed < declared_len {
        let remaining = declared_len - consumed;
        let want = buf.len().min(remaining as usize);
        let n = stream
            .read(&mut buf[..want])
            .map_err(UpdateError::Transport)?;
        if n == 0 {
            return Err(UpdateError::TruncatedStream {
                expected: declared_len,
                read: consumed,
            });
        }
        hasher.update(&buf[..n]);
        consumed += n as u64;
    }

    Ok(hex::encode(hasher.finalize()))
}
