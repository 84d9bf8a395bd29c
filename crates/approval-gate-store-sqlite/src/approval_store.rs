// crates/approval-gate-store-sqlite/src/approval_store.rs
// ============================================================================
// Module: SQLite Approval Store
// Description: ApprovalStore implementation over the `approvals` table.
// Purpose: Durable, CAS-guarded persistence of the approval lifecycle of
// §4.2, with uniqueness enforced on (tenant_id, operator_id, request_id).
// Dependencies: approval_gate_core, rusqlite
// ============================================================================

use approval_gate_core::ApprovalId;
use approval_gate_core::ApprovalQuery;
use approval_gate_core::ApprovalRecord;
use approval_gate_core::ApprovalStatus;
use approval_gate_core::ApprovalStore;
use approval_gate_core::CreateApprovalInput;
use approval_gate_core::DecideApprovalInput;
use approval_gate_core::OperatorId;
use approval_gate_core::PlanStep;
use approval_gate_core::RequestId;
use approval_gate_core::StoreError;
use approval_gate_core::TenantId;
use approval_gate_core::Timestamp;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::codec::action_mode_to_str;
use crate::codec::str_to_action_mode;
use crate::codec::str_to_approval_status;
use crate::store::SqliteStore;

/// All columns of the `approvals` table, in `SELECT *` order, as raw
/// `SQLite`-native values; decoded into an [`ApprovalRecord`] by
/// [`decode_row`] outside the row callback so decode errors can carry a
/// readable message instead of being shoehorned into [`rusqlite::Error`].
struct RawRow {
    id: String,
    request_id: String,
    operator_id: String,
    workspace_id: String,
    tenant_id: String,
    municipality_id: String,
    action_intent: String,
    action_mode: String,
    plan_hash: String,
    plan_steps_json: String,
    audit_record_json: String,
    decision_result_json: String,
    approval_status: String,
    approver_id: Option<String>,
    approval_note: Option<String>,
    dispatched_at: Option<String>,
    dispatch_result_json: Option<String>,
    created_at: String,
    expires_at: String,
}

const SELECT_COLUMNS: &str = "id, request_id, operator_id, workspace_id, tenant_id, \
    municipality_id, action_intent, action_mode, plan_hash, plan_steps_json, \
    audit_record_json, decision_result_json, approval_status, approver_id, \
    approval_note, dispatched_at, dispatch_result_json, created_at, expires_at";

fn row_to_raw(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        request_id: row.get(1)?,
        operator_id: row.get(2)?,
        workspace_id: row.get(3)?,
        tenant_id: row.get(4)?,
        municipality_id: row.get(5)?,
        action_intent: row.get(6)?,
        action_mode: row.get(7)?,
        plan_hash: row.get(8)?,
        plan_steps_json: row.get(9)?,
        audit_record_json: row.get(10)?,
        decision_result_json: row.get(11)?,
        approval_status: row.get(12)?,
        approver_id: row.get(13)?,
        approval_note: row.get(14)?,
        dispatched_at: row.get(15)?,
        dispatch_result_json: row.get(16)?,
        created_at: row.get(17)?,
        expires_at: row.get(18)?,
    })
}

fn decode_row(raw: RawRow) -> Result<ApprovalRecord, StoreError> {
    let plan_steps: Vec<PlanStep> = serde_json::from_str(&raw.plan_steps_json)
        .map_err(|err| StoreError::Decode(err.to_string()))?;
    let audit_record = serde_json::from_str(&raw.audit_record_json)
        .map_err(|err| StoreError::Decode(err.to_string()))?;
    let decision_result = serde_json::from_str(&raw.decision_result_json)
        .map_err(|err| StoreError::Decode(err.to_string()))?;
    let dispatch_result = raw
        .dispatch_result_json
        .map(|text| serde_json::from_str(&text).map_err(|err| StoreError::Decode(err.to_string())))
        .transpose()?;
    let dispatched_at = raw
        .dispatched_at
        .map(|text| Timestamp::parse(&text).map_err(|err| StoreError::Decode(err.to_string())))
        .transpose()?;

    Ok(ApprovalRecord {
        id: ApprovalId::new(raw.id),
        request_id: RequestId::new(raw.request_id),
        operator_id: OperatorId::new(raw.operator_id),
        workspace_id: raw.workspace_id.into(),
        tenant_id: TenantId::new(raw.tenant_id),
        municipality_id: raw.municipality_id.into(),
        action_intent: raw.action_intent.as_str().into(),
        action_mode: str_to_action_mode(&raw.action_mode)
            .map_err(StoreError::Decode)?,
        plan_hash: raw.plan_hash,
        plan_steps,
        audit_record,
        decision_result,
        approval_status: str_to_approval_status(&raw.approval_status)
            .map_err(StoreError::Decode)?,
        approver_id: raw.approver_id.map(OperatorId::new),
        approval_note: raw.approval_note,
        dispatched_at,
        dispatch_result,
        created_at: Timestamp::parse(&raw.created_at)
            .map_err(|err| StoreError::Decode(err.to_string()))?,
        expires_at: Timestamp::parse(&raw.expires_at)
            .map_err(|err| StoreError::Decode(err.to_string()))?,
    })
}

impl ApprovalStore for SqliteStore {
    fn create(&self, input: CreateApprovalInput) -> Result<ApprovalRecord, StoreError> {
        let plan_hash = approval_gate_core::plan_hash(&input.plan_steps)
            .map_err(|err| StoreError::Io(err.to_string()))?;
        let id = ApprovalId::new(uuid::Uuid::new_v4().to_string());
        let plan_steps_json =
            serde_json::to_string(&input.plan_steps).map_err(|err| StoreError::Io(err.to_string()))?;
        let audit_record_json = serde_json::to_string(&input.audit_record)
            .map_err(|err| StoreError::Io(err.to_string()))?;
        let decision_result_json = serde_json::to_string(&input.decision_result)
            .map_err(|err| StoreError::Io(err.to_string()))?;
        let expires_at = input.created_at.plus_seconds(input.ttl_seconds);

        let guard = self.lock();
        let outcome = guard.execute(
            "INSERT INTO approvals (
                id, request_id, operator_id, workspace_id, tenant_id, municipality_id,
                action_intent, action_mode, plan_hash, plan_steps_json, audit_record_json,
                decision_result_json, approval_status, approver_id, approval_note,
                dispatched_at, dispatch_result_json, created_at, expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 'pending', NULL, NULL, \
            NULL, NULL, ?13, ?14)",
            params![
                id.as_str(),
                input.request_id.as_str(),
                input.operator_id.as_str(),
                input.workspace_id.as_str(),
                input.tenant_id.as_str(),
                input.municipality_id.as_str(),
                input.action_intent.as_str(),
                action_mode_to_str(input.action_mode),
                plan_hash,
                plan_steps_json,
                audit_record_json,
                decision_result_json,
                input.created_at.to_rfc3339(),
                expires_at.to_rfc3339(),
            ],
        );
        drop(guard);

        match outcome {
            Ok(_) => self
                .find_by_id(&id)?
                .ok_or_else(|| StoreError::Io("row vanished immediately after insert".to_string())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateRequest)
            }
            Err(err) => Err(StoreError::Io(err.to_string())),
        }
    }

    fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRecord>, StoreError> {
        let guard = self.lock();
        let raw = guard
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM approvals WHERE id = ?1"),
                params![id.as_str()],
                row_to_raw,
            )
            .optional()
            .map_err(|err| StoreError::Io(err.to_string()))?;
        raw.map(decode_row).transpose()
    }

    fn find_by_request_id(
        &self,
        tenant_id: &TenantId,
        operator_id: &OperatorId,
        request_id: &RequestId,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        let guard = self.lock();
        let raw = guard
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM approvals \
                     WHERE tenant_id = ?1 AND operator_id = ?2 AND request_id = ?3"
                ),
                params![tenant_id.as_str(), operator_id.as_str(), request_id.as_str()],
                row_to_raw,
            )
            .optional()
            .map_err(|err| StoreError::Io(err.to_string()))?;
        raw.map(decode_row).transpose()
    }

    fn query(&self, query: &ApprovalQuery) -> Result<Vec<ApprovalRecord>, StoreError> {
        let guard = self.lock();
        // Both filters are always bound, as an empty string sentinel that
        // never matches a real column value; this keeps the ?1..?4
        // placeholder positions fixed regardless of which filters the
        // caller actually set.
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM approvals \
             WHERE (?1 = '' OR approval_status = ?1) AND (?2 = '' OR operator_id = ?2) \
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        );

        let status_param = query.approval_status.map(ApprovalStatus::as_str).unwrap_or_default();
        let operator_param = query
            .operator_id
            .as_ref()
            .map(OperatorId::as_str)
            .unwrap_or_default();
        let limit = i64::from(query.limit.unwrap_or(100));
        let offset = i64::from(query.offset.unwrap_or(0));

        let mut stmt = guard.prepare(&sql).map_err(|err| StoreError::Io(err.to_string()))?;
        let rows = stmt
            .query_map(
                params![status_param, operator_param, limit, offset],
                row_to_raw,
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(decode_row(row.map_err(|err| StoreError::Io(err.to_string()))?)?);
        }
        Ok(out)
    }

    fn count_pending(&self) -> Result<u64, StoreError> {
        let guard = self.lock();
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(1) FROM approvals WHERE approval_status = 'pending'",
                params![],
                |row| row.get(0),
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(u64::try_from(count.max(0)).unwrap_or(0))
    }

    fn decide(&self, input: DecideApprovalInput) -> Result<Option<ApprovalRecord>, StoreError> {
        if input.status != ApprovalStatus::Approved && input.status != ApprovalStatus::Rejected {
            return Err(StoreError::Io(
                "decide requires Approved or Rejected".to_string(),
            ));
        }
        let decided_at = input.decided_at.to_rfc3339();
        let guard = self.lock();
        let changed = guard
            .execute(
                "UPDATE approvals SET approval_status = ?1, approver_id = ?2, approval_note = ?3
                 WHERE id = ?4 AND approval_status = 'pending' AND expires_at > ?5",
                params![
                    input.status.as_str(),
                    input.approver_id.as_str(),
                    input.note,
                    input.approval_id.as_str(),
                    decided_at,
                ],
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;
        if changed == 0 {
            // Either already decided, or its TTL has elapsed; expire it in
            // the latter case so a pending-but-stale row doesn't linger
            // until the next background sweep.
            guard
                .execute(
                    "UPDATE approvals SET approval_status = 'expired'
                     WHERE id = ?1 AND approval_status = 'pending' AND expires_at <= ?2",
                    params![input.approval_id.as_str(), decided_at],
                )
                .map_err(|err| StoreError::Io(err.to_string()))?;
            drop(guard);
            return Ok(None);
        }
        drop(guard);
        self.find_by_id(&input.approval_id)
    }

    fn mark_dispatching(&self, id: &ApprovalId) -> Result<Option<ApprovalRecord>, StoreError> {
        let guard = self.lock();
        let changed = guard
            .execute(
                "UPDATE approvals SET approval_status = 'dispatching'
                 WHERE id = ?1 AND approval_status = 'approved'",
                params![id.as_str()],
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;
        drop(guard);
        if changed == 0 {
            return Ok(None);
        }
        self.find_by_id(id)
    }

    fn mark_dispatched(
        &self,
        id: &ApprovalId,
        result: serde_json::Value,
        at: Timestamp,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        let result_json = serde_json::to_string(&result).map_err(|err| StoreError::Io(err.to_string()))?;
        let guard = self.lock();
        let changed = guard
            .execute(
                "UPDATE approvals SET approval_status = 'dispatched', dispatched_at = ?1, \
                 dispatch_result_json = ?2 WHERE id = ?3 AND approval_status = 'dispatching'",
                params![at.to_rfc3339(), result_json, id.as_str()],
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;
        drop(guard);
        if changed == 0 {
            return Ok(None);
        }
        self.find_by_id(id)
    }

    fn mark_dispatch_failed(
        &self,
        id: &ApprovalId,
        error: serde_json::Value,
        at: Timestamp,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        let error_json = serde_json::to_string(&error).map_err(|err| StoreError::Io(err.to_string()))?;
        let guard = self.lock();
        let changed = guard
            .execute(
                "UPDATE approvals SET approval_status = 'dispatch_failed', dispatched_at = ?1, \
                 dispatch_result_json = ?2 WHERE id = ?3 AND approval_status = 'dispatching'",
                params![at.to_rfc3339(), error_json, id.as_str()],
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;
        drop(guard);
        if changed == 0 {
            return Ok(None);
        }
        self.find_by_id(id)
    }

    fn expire_pending(&self, now: Timestamp) -> Result<u64, StoreError> {
        let guard = self.lock();
        let changed = guard
            .execute(
                "UPDATE approvals SET approval_status = 'expired'
                 WHERE approval_status = 'pending' AND expires_at < ?1",
                params![now.to_rfc3339()],
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(u64::try_from(changed).unwrap_or(u64::MAX))
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock();
        guard
            .query_row("SELECT 1", params![], |_| Ok(()))
            .map_err(|err| StoreError::Io(err.to_string()))
    }
}
