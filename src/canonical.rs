//! Canonical serialization for deterministic fingerprints.
//!
//! Policy matrices and reports are fingerprinted so two runs can be compared
//! without diffing files.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_determinism() {
        let mut flags = BTreeMap::new();
        flags.insert("AdminTo", true);
        flags.insert("MemberOf", false);

        assert_eq!(canonical_hash(&flags), canonical_hash(&flags.clone()));
        assert_eq!(canonical_hash_hex(&flags).len(), 16);
    }

    #[test]
    fn test_order_sensitive_for_vecs() {
        let a = vec!["ALICE", "BOB"];
        let b = vec!["BOB", "ALICE"];
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }
}
