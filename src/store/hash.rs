//! Snapshot fingerprints.
//!
//! `status` reports one SHA-256 digest per kind folder so two snapshots can
//! be compared without diffing every document.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest over `(key, document)` pairs, in the order given.
///
/// Each key and document is length-prefixed so that moving bytes between
/// adjacent entries changes the digest.
#[must_use]
pub fn snapshot_digest<'a>(documents: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut hasher = Sha256::new();
    for (key, document) in documents {
        hasher.update((key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update((document.len() as u64).to_le_bytes());
        hasher.update(document.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
