// crates/approval-gate-core/src/hashing.rs
// ============================================================================
// Module: Approval Gate Hashing
// Description: Canonical JSON hashing for plan fingerprints.
// Purpose: Provide a deterministic fingerprint of a plan so that a plan
// cannot be mutated at rest between approval and dispatch undetected.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! `plan_hash` is the SHA-256 digest of the RFC 8785-canonicalized JSON
//! encoding of a plan's steps. Canonicalization (sorted object keys, no
//! insignificant whitespace) makes the digest independent of incidental
//! serialization choices.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while computing a plan hash.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashError {
    /// The value could not be canonicalized to JSON.
    #[error("canonical json encoding failed: {0}")]
    Canonicalize(String),
}

// ============================================================================
// SECTION: Plan Hash
// ============================================================================

/// Computes the 64-hex-character `plan_hash` fingerprint of a serializable value.
///
/// # Errors
///
/// Returns [`HashError`] when `value` cannot be canonicalized to JSON.
pub fn plan_hash<T: Serialize>(value: &T) -> Result<String, HashError> {
    let canonical =
        serde_jcs::to_string(value).map_err(|err| HashError::Canonicalize(err.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex_encode(&hasher.finalize()))
}

/// Renders bytes as a lowercase hex string.
#[must_use]
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::plan_hash;
    use serde_json::json;

    #[test]
    fn is_deterministic_regardless_of_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(plan_hash(&a).expect("hash"), plan_hash(&b).expect("hash"));
    }

    #[test]
    fn is_64_hex_characters() {
        let digest = plan_hash(&json!([1, 2, 3])).expect("hash");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn differs_for_different_content() {
        let a = plan_hash(&json!({"step": 1})).expect("hash");
        let b = plan_hash(&json!({"step": 2})).expect("hash");
        assert_ne!(a, b);
    }
}
