//! Canonical serialization for stable hashing.
//!
//! Used to fingerprint policies so an operator can tell which parameter set
//! scored a record.
//!
//! - Struct fields serialize in declaration order
//! - Maps in hashed data must be `BTreeMap` (or sorted `Vec`s)
//! - Floats are quantized by the caller before hashing

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes.
///
/// Serialization of plain data structs cannot fail; a failure yields an empty
/// buffer rather than a panic.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// xxHash64 of the canonical bytes of a value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Canonical hash as a 16-character lowercase hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
