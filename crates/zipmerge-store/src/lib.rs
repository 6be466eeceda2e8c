//! zipmerge-store: Run manifests for the merge pipeline
//!
//! Hashes every input table together with the content-affecting config
//! (blake3), records the hashes of what a run wrote, and answers whether a
//! later run with the same inputs can be skipped.

pub mod hash;
pub mod input;
pub mod manifest;

pub use hash::{combine_hashes, hash_bytes, hash_file, short_hex};
pub use input::RunInput;
pub use manifest::{Lookup, MANIFEST_FILE, RunManifest, VerifyResult};
