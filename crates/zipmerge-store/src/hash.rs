//! Blake3 hashing helpers

use std::io;
use std::path::Path;

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_mmap(path)?;
    Ok(hasher.finalize())
}

pub fn hash_bytes(data: &[u8]) -> blake3::Hash {
    blake3::hash(data)
}

/// Hash of the concatenated digests, so order matters.
pub fn combine_hashes(hashes: &[blake3::Hash]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize()
}

/// First 8 characters of a stored hex digest, for log lines and tables.
/// Shorter strings pass through.
pub fn short_hex(hex: &str) -> &str {
    hex.get(..8).unwrap_or(hex)
}

/// Parse a full hex digest as stored in a manifest.
pub fn parse_hex(hex: &str) -> Option<blake3::Hash> {
    blake3::Hash::from_hex(hex).ok()
}
