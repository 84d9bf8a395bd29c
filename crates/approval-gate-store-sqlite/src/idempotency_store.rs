// crates/approval-gate-store-sqlite/src/idempotency_store.rs
// ============================================================================
// Module: SQLite Idempotency Store
// Description: IdempotencyStore implementation over the `idempotency` table.
// Purpose: Dedupe `/pj/execute` submissions by (operator, tenant,
// request_id) and persist the prior result for exact replay, per §4.8.
// Dependencies: approval_gate_core, rusqlite
// ============================================================================

use approval_gate_core::IdempotencyEntry;
use approval_gate_core::IdempotencyError;
use approval_gate_core::IdempotencyKey;
use approval_gate_core::IdempotencyStore;
use approval_gate_core::Timestamp;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteStore;

/// Default time an idempotency entry is retained before [`SqliteStore`]'s
/// `prune_expired` reclaims it. No fixed duration is named in the
/// persistence layout; a day covers the slowest plausible client retry
/// window without keeping every historical submission forever.
const DEFAULT_TTL_SECONDS: i64 = 86_400;

fn io_err(err: rusqlite::Error) -> IdempotencyError {
    IdempotencyError::Io(err.to_string())
}

impl IdempotencyStore for SqliteStore {
    fn find(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyEntry>, IdempotencyError> {
        let guard = self.lock();
        let raw: Option<(i64, String, u16, String)> = guard
            .query_row(
                "SELECT schema_version, result_json, status_code, created_at FROM idempotency \
                 WHERE operator_id = ?1 AND tenant_id = ?2 AND request_id = ?3",
                params![
                    key.operator_id.as_str(),
                    key.tenant_id.as_str(),
                    key.request_id.as_str()
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(io_err)?;

        let Some((schema_version, result_json, status_code, created_at)) = raw else {
            return Ok(None);
        };
        let result_json = serde_json::from_str(&result_json)
            .map_err(|err| IdempotencyError::Io(err.to_string()))?;
        let created_at =
            Timestamp::parse(&created_at).map_err(|err| IdempotencyError::Io(err.to_string()))?;
        Ok(Some(IdempotencyEntry {
            key: key.clone(),
            schema_version: u32::try_from(schema_version).unwrap_or(0),
            result_json,
            status_code,
            created_at,
        }))
    }

    fn put(&self, entry: IdempotencyEntry) -> Result<(), IdempotencyError> {
        let result_json = serde_json::to_string(&entry.result_json)
            .map_err(|err| IdempotencyError::Io(err.to_string()))?;
        let guard = self.lock();
        guard
            .execute(
                "INSERT INTO idempotency (
                    operator_id, tenant_id, request_id, schema_version, result_json,
                    status_code, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (operator_id, tenant_id, request_id) DO UPDATE SET
                    schema_version = excluded.schema_version,
                    result_json = excluded.result_json,
                    status_code = excluded.status_code,
                    created_at = excluded.created_at",
                params![
                    entry.key.operator_id.as_str(),
                    entry.key.tenant_id.as_str(),
                    entry.key.request_id.as_str(),
                    entry.schema_version,
                    result_json,
                    entry.status_code,
                    entry.created_at.to_rfc3339(),
                ],
            )
            .map_err(io_err)?;
        Ok(())
    }

    fn prune_expired(&self, now: Timestamp) -> Result<u64, IdempotencyError> {
        let cutoff = now.plus_seconds(-DEFAULT_TTL_SECONDS);
        let guard = self.lock();
        let changed = guard
            .execute(
                "DELETE FROM idempotency WHERE created_at < ?1",
                params![cutoff.to_rfc3339()],
            )
            .map_err(io_err)?;
        Ok(u64::try_from(changed).unwrap_or(u64::MAX))
    }

    fn readiness(&self) -> Result<(), IdempotencyError> {
        let guard = self.lock();
        guard
            .query_row("SELECT 1", params![], |_| Ok(()))
            .map_err(io_err)
    }
}
