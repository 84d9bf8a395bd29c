// crates/approval-gate-core/src/idempotency.rs
// ============================================================================
// Module: Idempotency Key and Entry
// Description: The composite dedupe key and stored replay entry for
// /pj/execute submissions.
// Purpose: Let every idempotency store backend share one key and entry shape.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A submission is deduplicated by `(operator_id, tenant_id, request_id,
//! schema_version)`. A replay with the same key and schema version returns
//! the stored `result_json` verbatim; a replay with the same triple but a
//! different schema version is a conflict, not a replay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::OperatorId;
use crate::identifiers::RequestId;
use crate::identifiers::TenantId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Idempotency Key
// ============================================================================

/// Composite key deduplicating `/pj/execute` submissions.
///
/// # Invariants
/// - Two submissions with an equal key but differing `schema_version` are a
///   conflict, never a replay.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    /// Operator who made the submission.
    pub operator_id: OperatorId,
    /// Tenant the submission is scoped to.
    pub tenant_id: TenantId,
    /// Caller-supplied request identifier.
    pub request_id: RequestId,
}

impl IdempotencyKey {
    /// Creates a new idempotency key.
    #[must_use]
    pub const fn new(operator_id: OperatorId, tenant_id: TenantId, request_id: RequestId) -> Self {
        Self {
            operator_id,
            tenant_id,
            request_id,
        }
    }
}

// ============================================================================
// SECTION: Idempotency Entry
// ============================================================================

/// A stored prior result for exact replay.
///
/// # Invariants
/// - `result_json` is the verbatim response body returned on the original
///   submission; a replay returns it byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyEntry {
    /// Deduplication key.
    pub key: IdempotencyKey,
    /// Schema version of the request body that produced `result_json`.
    pub schema_version: u32,
    /// The verbatim prior response body.
    pub result_json: serde_json::Value,
    /// HTTP status code the original submission returned.
    pub status_code: u16,
    /// Instant this entry was recorded.
    pub created_at: Timestamp,
}

/// Outcome of looking up an idempotency key against a submitted
/// `schema_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyLookup {
    /// No entry exists; the caller should proceed with a fresh submission.
    Fresh,
    /// An entry exists with a matching schema version; replay it verbatim.
    Replay,
    /// An entry exists but the schema version differs; surface a conflict.
    SchemaMismatch,
}

/// Classifies a lookup against a stored entry's schema version.
#[must_use]
pub fn classify_lookup(
    existing: Option<&IdempotencyEntry>,
    requested_schema_version: u32,
) -> IdempotencyLookup {
    match existing {
        None => IdempotencyLookup::Fresh,
        Some(entry) if entry.schema_version == requested_schema_version => {
            IdempotencyLookup::Replay
        }
        Some(_) => IdempotencyLookup::SchemaMismatch,
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::IdempotencyEntry;
    use super::IdempotencyKey;
    use super::IdempotencyLookup;
    use super::classify_lookup;
    use crate::identifiers::OperatorId;
    use crate::identifiers::RequestId;
    use crate::identifiers::TenantId;
    use crate::time::Timestamp;
    use serde_json::json;

    fn entry(schema_version: u32) -> IdempotencyEntry {
        IdempotencyEntry {
            key: IdempotencyKey::new(
                OperatorId::new("op-1"),
                TenantId::new("tenant-1"),
                RequestId::new("req-1"),
            ),
            schema_version,
            result_json: json!({"ok": true}),
            status_code: 202,
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn fresh_when_no_entry_exists() {
        assert_eq!(classify_lookup(None, 1), IdempotencyLookup::Fresh);
    }

    #[test]
    fn replay_when_schema_version_matches() {
        let e = entry(2);
        assert_eq!(classify_lookup(Some(&e), 2), IdempotencyLookup::Replay);
    }

    #[test]
    fn conflict_when_schema_version_differs() {
        let e = entry(1);
        assert_eq!(
            classify_lookup(Some(&e), 2),
            IdempotencyLookup::SchemaMismatch
        );
    }
}
