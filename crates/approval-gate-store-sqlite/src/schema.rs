// crates/approval-gate-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Schema
// Description: Table definitions and the always-present default chain
// template.
// Purpose: Give the store a single place to create and version its tables,
// per the persistent state layout of §6.
// Dependencies: approval_gate_core, rusqlite
// ============================================================================

use approval_gate_core::DEFAULT_TEMPLATE_ID;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::config::SqliteConnectionError;

/// Current schema version. Bump when `initialize` gains a migration arm.
const SCHEMA_VERSION: i64 = 1;

/// Creates every table named in the persistent state layout (`approvals`,
/// `chain_templates`, `chain_template_steps`, `chain_steps`, `idempotency`)
/// if absent, and seeds the immutable default chain template.
///
/// # Errors
///
/// Returns [`SqliteConnectionError`] on underlying `SQLite` failure.
pub fn initialize(connection: &mut Connection) -> Result<(), SqliteConnectionError> {
    let tx = connection
        .transaction()
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;

    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;

    if version.is_none() {
        tx.execute(
            "INSERT INTO store_meta (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;

        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS approvals (
                id TEXT PRIMARY KEY,
                request_id TEXT NOT NULL,
                operator_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                municipality_id TEXT NOT NULL,
                action_intent TEXT NOT NULL,
                action_mode TEXT NOT NULL,
                plan_hash TEXT NOT NULL,
                plan_steps_json TEXT NOT NULL,
                audit_record_json TEXT NOT NULL,
                decision_result_json TEXT NOT NULL,
                approval_status TEXT NOT NULL,
                approver_id TEXT,
                approval_note TEXT,
                dispatched_at TEXT,
                dispatch_result_json TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                UNIQUE (tenant_id, operator_id, request_id)
            );
            CREATE INDEX IF NOT EXISTS idx_approvals_status
                ON approvals (approval_status);
            CREATE INDEX IF NOT EXISTS idx_approvals_operator
                ON approvals (operator_id);

            CREATE TABLE IF NOT EXISTS chain_templates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS chain_template_steps (
                template_id TEXT NOT NULL REFERENCES chain_templates(id) ON DELETE CASCADE,
                step_order INTEGER NOT NULL,
                required_role TEXT NOT NULL,
                label TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chain_template_steps_template
                ON chain_template_steps (template_id, step_order);

            CREATE TABLE IF NOT EXISTS chain_steps (
                id TEXT PRIMARY KEY,
                approval_id TEXT NOT NULL,
                template_id TEXT NOT NULL,
                step_order INTEGER NOT NULL,
                required_role TEXT NOT NULL,
                label TEXT NOT NULL,
                status TEXT NOT NULL,
                decider_id TEXT,
                decider_note TEXT,
                decided_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chain_steps_approval
                ON chain_steps (approval_id, step_order);
            CREATE INDEX IF NOT EXISTS idx_chain_steps_status
                ON chain_steps (status);

            CREATE TABLE IF NOT EXISTS idempotency (
                operator_id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                request_id TEXT NOT NULL,
                schema_version INTEGER NOT NULL,
                result_json TEXT NOT NULL,
                status_code INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (operator_id, tenant_id, request_id)
            );",
        )
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;

        seed_default_template(&tx)?;
    }

    tx.commit()
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))
}

/// Inserts the always-present default chain template, a single-step
/// approval gated on the `"approver"` role, if it does not already exist.
fn seed_default_template(
    tx: &rusqlite::Transaction<'_>,
) -> Result<(), SqliteConnectionError> {
    let exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM chain_templates WHERE id = ?1",
            params![DEFAULT_TEMPLATE_ID],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    if exists.is_some() {
        return Ok(());
    }

    tx.execute(
        "INSERT INTO chain_templates (id, name, description) VALUES (?1, ?2, ?3)",
        params![
            DEFAULT_TEMPLATE_ID,
            "Default",
            "Single-step approval requiring the approver role.",
        ],
    )
    .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    tx.execute(
        "INSERT INTO chain_template_steps (template_id, step_order, required_role, label)
         VALUES (?1, 0, ?2, ?3)",
        params![DEFAULT_TEMPLATE_ID, "approver", "Approval"],
    )
    .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    Ok(())
}
