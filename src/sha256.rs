//! SHA-256 confirmation step.
//!
//! Candidates are short (tens of bytes), so only the single-shot form is
//! needed — no streaming, no incremental state to carry across positions the
//! way the Adler-32 prefilter does.

use sha2::{Digest, Sha256};

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
