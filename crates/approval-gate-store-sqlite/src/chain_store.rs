// crates/approval-gate-store-sqlite/src/chain_store.rs
// ============================================================================
// Module: SQLite Chain Store
// Description: ChainStore implementation over `chain_templates`,
// `chain_template_steps`, and `chain_steps`.
// Purpose: Template CRUD plus the order-group activation and rejection
// propagation rules of §4.3, with `decide_step` CAS-guarded per step.
// Dependencies: approval_gate_core, rusqlite
// ============================================================================

use approval_gate_core::ApprovalId;
use approval_gate_core::ChainError;
use approval_gate_core::ChainProgress;
use approval_gate_core::ChainStepInstance;
use approval_gate_core::ChainStepStatus;
use approval_gate_core::ChainStore;
use approval_gate_core::ChainTemplate;
use approval_gate_core::ChainTemplateStep;
use approval_gate_core::CreateTemplateInput;
use approval_gate_core::DecideStepInput;
use approval_gate_core::DEFAULT_TEMPLATE_ID;
use approval_gate_core::OperatorId;
use approval_gate_core::StepDecisionOutcome;
use approval_gate_core::StepId;
use approval_gate_core::TemplateId;
use approval_gate_core::Timestamp;
use approval_gate_core::validate_orders;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;

use crate::codec::chain_step_status_to_str;
use crate::codec::str_to_chain_step_status;
use crate::store::SqliteStore;

/// Maps a `rusqlite` failure to [`ChainError::Io`].
fn io_err(err: rusqlite::Error) -> ChainError {
    ChainError::Io(err.to_string())
}

struct RawStep {
    id: String,
    approval_id: String,
    template_id: String,
    step_order: i64,
    required_role: String,
    label: String,
    status: String,
    decider_id: Option<String>,
    decider_note: Option<String>,
    decided_at: Option<String>,
    created_at: String,
}

const STEP_COLUMNS: &str = "id, approval_id, template_id, step_order, required_role, label, \
    status, decider_id, decider_note, decided_at, created_at";

fn row_to_raw_step(row: &Row<'_>) -> rusqlite::Result<RawStep> {
    Ok(RawStep {
        id: row.get(0)?,
        approval_id: row.get(1)?,
        template_id: row.get(2)?,
        step_order: row.get(3)?,
        required_role: row.get(4)?,
        label: row.get(5)?,
        status: row.get(6)?,
        decider_id: row.get(7)?,
        decider_note: row.get(8)?,
        decided_at: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn decode_step(raw: RawStep) -> Result<ChainStepInstance, ChainError> {
    let decided_at = raw
        .decided_at
        .map(|text| Timestamp::parse(&text).map_err(|err| ChainError::Io(err.to_string())))
        .transpose()?;
    Ok(ChainStepInstance {
        id: StepId::new(raw.id),
        approval_id: ApprovalId::new(raw.approval_id),
        template_id: TemplateId::new(raw.template_id),
        step_order: u32::try_from(raw.step_order).unwrap_or(0),
        required_role: raw.required_role,
        label: raw.label,
        status: str_to_chain_step_status(&raw.status).map_err(ChainError::Io)?,
        decider_id: raw.decider_id.map(OperatorId::new),
        decider_note: raw.decider_note,
        decided_at,
        created_at: Timestamp::parse(&raw.created_at).map_err(|err| ChainError::Io(err.to_string()))?,
    })
}

fn load_template_steps(
    connection: &Connection,
    template_id: &str,
) -> Result<Vec<ChainTemplateStep>, ChainError> {
    let mut stmt = connection
        .prepare(
            "SELECT step_order, required_role, label FROM chain_template_steps \
             WHERE template_id = ?1 ORDER BY step_order ASC",
        )
        .map_err(io_err)?;
    let rows = stmt
        .query_map(params![template_id], |row| {
            let order: i64 = row.get(0)?;
            Ok(ChainTemplateStep {
                order: u32::try_from(order).unwrap_or(0),
                required_role: row.get(1)?,
                label: row.get(2)?,
            })
        })
        .map_err(io_err)?;
    let mut steps = Vec::new();
    for row in rows {
        steps.push(row.map_err(io_err)?);
    }
    Ok(steps)
}

fn load_template(
    connection: &Connection,
    id: &str,
) -> Result<Option<ChainTemplate>, ChainError> {
    let found: Option<(String, Option<String>)> = connection
        .query_row(
            "SELECT name, description FROM chain_templates WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(io_err)?;
    let Some((name, description)) = found else {
        return Ok(None);
    };
    let steps = load_template_steps(connection, id)?;
    Ok(Some(ChainTemplate {
        id: TemplateId::new(id.to_string()),
        name,
        description,
        steps,
    }))
}

fn insert_template_steps(
    tx: &Transaction<'_>,
    template_id: &str,
    steps: &[ChainTemplateStep],
) -> Result<(), ChainError> {
    for step in steps {
        tx.execute(
            "INSERT INTO chain_template_steps (template_id, step_order, required_role, label) \
             VALUES (?1, ?2, ?3, ?4)",
            params![template_id, step.order, step.required_role, step.label],
        )
        .map_err(io_err)?;
    }
    Ok(())
}

impl ChainStore for SqliteStore {
    fn create_template(&self, input: CreateTemplateInput) -> Result<ChainTemplate, ChainError> {
        let steps = validate_orders(input.steps).map_err(|_| ChainError::NonSequentialOrders)?;
        let id = input
            .id
            .unwrap_or_else(|| TemplateId::new(uuid::Uuid::new_v4().to_string()));

        let mut guard = self.lock();
        let tx = guard.transaction().map_err(io_err)?;
        tx.execute(
            "INSERT INTO chain_templates (id, name, description) VALUES (?1, ?2, ?3)",
            params![id.as_str(), input.name, input.description],
        )
        .map_err(io_err)?;
        insert_template_steps(&tx, id.as_str(), &steps)?;
        tx.commit().map_err(io_err)?;

        Ok(ChainTemplate {
            id,
            name: input.name,
            description: input.description,
            steps,
        })
    }

    fn get_template(&self, id: &TemplateId) -> Result<Option<ChainTemplate>, ChainError> {
        let guard = self.lock();
        load_template(&guard, id.as_str())
    }

    fn list_templates(&self) -> Result<Vec<ChainTemplate>, ChainError> {
        let guard = self.lock();
        let mut stmt = guard
            .prepare("SELECT id FROM chain_templates ORDER BY id ASC")
            .map_err(io_err)?;
        let ids = stmt
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(io_err)?;
        let mut templates = Vec::new();
        for id in ids {
            let id = id.map_err(io_err)?;
            if let Some(template) = load_template(&guard, &id)? {
                templates.push(template);
            }
        }
        Ok(templates)
    }

    fn update_template(
        &self,
        id: &TemplateId,
        input: CreateTemplateInput,
    ) -> Result<ChainTemplate, ChainError> {
        if id.as_str() == DEFAULT_TEMPLATE_ID {
            return Err(ChainError::DefaultTemplateImmutable);
        }
        let steps = validate_orders(input.steps).map_err(|_| ChainError::NonSequentialOrders)?;

        let mut guard = self.lock();
        let tx = guard.transaction().map_err(io_err)?;
        let changed = tx
            .execute(
                "UPDATE chain_templates SET name = ?1, description = ?2 WHERE id = ?3",
                params![input.name, input.description, id.as_str()],
            )
            .map_err(io_err)?;
        if changed == 0 {
            return Err(ChainError::TemplateNotFound);
        }
        tx.execute(
            "DELETE FROM chain_template_steps WHERE template_id = ?1",
            params![id.as_str()],
        )
        .map_err(io_err)?;
        insert_template_steps(&tx, id.as_str(), &steps)?;
        tx.commit().map_err(io_err)?;

        Ok(ChainTemplate {
            id: id.clone(),
            name: input.name,
            description: input.description,
            steps,
        })
    }

    fn delete_template(&self, id: &TemplateId) -> Result<(), ChainError> {
        if id.as_str() == DEFAULT_TEMPLATE_ID {
            return Err(ChainError::DefaultTemplateImmutable);
        }
        let mut guard = self.lock();
        let tx = guard.transaction().map_err(io_err)?;
        let in_use: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM chain_steps WHERE template_id = ?1 \
                 AND status IN ('pending', 'active') LIMIT 1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(io_err)?;
        if in_use.is_some() {
            return Err(ChainError::InUse);
        }
        tx.execute(
            "DELETE FROM chain_template_steps WHERE template_id = ?1",
            params![id.as_str()],
        )
        .map_err(io_err)?;
        let changed = tx
            .execute("DELETE FROM chain_templates WHERE id = ?1", params![id.as_str()])
            .map_err(io_err)?;
        tx.commit().map_err(io_err)?;
        if changed == 0 {
            return Err(ChainError::TemplateNotFound);
        }
        Ok(())
    }

    fn create_chain_for_approval(
        &self,
        approval_id: &ApprovalId,
        template_id: &TemplateId,
        created_at: Timestamp,
    ) -> Result<Vec<ChainStepInstance>, ChainError> {
        let mut guard = self.lock();
        let tx = guard.transaction().map_err(io_err)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM chain_steps WHERE approval_id = ?1 LIMIT 1",
                params![approval_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(io_err)?;
        if exists.is_some() {
            return Err(ChainError::ChainExists);
        }

        let template_steps = load_template_steps(&tx, template_id.as_str())?;
        if template_steps.is_empty() {
            let template_row_exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM chain_templates WHERE id = ?1",
                    params![template_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(io_err)?;
            if template_row_exists.is_none() {
                return Err(ChainError::TemplateNotFound);
            }
        }

        let mut instances = Vec::with_capacity(template_steps.len());
        for step in &template_steps {
            let status = if step.order == 0 {
                ChainStepStatus::Active
            } else {
                ChainStepStatus::Pending
            };
            let id = StepId::new(uuid::Uuid::new_v4().to_string());
            tx.execute(
                "INSERT INTO chain_steps (
                    id, approval_id, template_id, step_order, required_role, label,
                    status, decider_id, decider_note, decided_at, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, NULL, ?8)",
                params![
                    id.as_str(),
                    approval_id.as_str(),
                    template_id.as_str(),
                    step.order,
                    step.required_role,
                    step.label,
                    chain_step_status_to_str(status),
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(io_err)?;
            instances.push(ChainStepInstance {
                id,
                approval_id: approval_id.clone(),
                template_id: template_id.clone(),
                step_order: step.order,
                required_role: step.required_role.clone(),
                label: step.label.clone(),
                status,
                decider_id: None,
                decider_note: None,
                decided_at: None,
                created_at,
            });
        }
        tx.commit().map_err(io_err)?;
        Ok(instances)
    }

    fn get_steps_for_approval(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Vec<ChainStepInstance>, ChainError> {
        let guard = self.lock();
        let mut stmt = guard
            .prepare(&format!(
                "SELECT {STEP_COLUMNS} FROM chain_steps WHERE approval_id = ?1 \
                 ORDER BY step_order ASC, created_at ASC"
            ))
            .map_err(io_err)?;
        let rows = stmt
            .query_map(params![approval_id.as_str()], row_to_raw_step)
            .map_err(io_err)?;
        let mut steps = Vec::new();
        for row in rows {
            steps.push(decode_step(row.map_err(io_err)?)?);
        }
        Ok(steps)
    }

    fn get_active_step(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Option<ChainStepInstance>, ChainError> {
        let guard = self.lock();
        let raw = guard
            .query_row(
                &format!(
                    "SELECT {STEP_COLUMNS} FROM chain_steps \
                     WHERE approval_id = ?1 AND status = 'active' \
                     ORDER BY step_order ASC LIMIT 1"
                ),
                params![approval_id.as_str()],
                row_to_raw_step,
            )
            .optional()
            .map_err(io_err)?;
        raw.map(decode_step).transpose()
    }

    fn get_active_steps(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Vec<ChainStepInstance>, ChainError> {
        let guard = self.lock();
        let mut stmt = guard
            .prepare(&format!(
                "SELECT {STEP_COLUMNS} FROM chain_steps \
                 WHERE approval_id = ?1 AND status = 'active' ORDER BY step_order ASC"
            ))
            .map_err(io_err)?;
        let rows = stmt
            .query_map(params![approval_id.as_str()], row_to_raw_step)
            .map_err(io_err)?;
        let mut steps = Vec::new();
        for row in rows {
            steps.push(decode_step(row.map_err(io_err)?)?);
        }
        Ok(steps)
    }

    fn get_step(&self, step_id: &StepId) -> Result<Option<ChainStepInstance>, ChainError> {
        let guard = self.lock();
        let raw = guard
            .query_row(
                &format!("SELECT {STEP_COLUMNS} FROM chain_steps WHERE id = ?1"),
                params![step_id.as_str()],
                row_to_raw_step,
            )
            .optional()
            .map_err(io_err)?;
        raw.map(decode_step).transpose()
    }

    fn get_chain_progress(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Option<ChainProgress>, ChainError> {
        let steps = self.get_steps_for_approval(approval_id)?;
        if steps.is_empty() {
            return Ok(None);
        }
        let total = steps.len();
        let completed = steps.iter().filter(|step| step.status.is_terminal()).count();
        let rejected = steps.iter().any(|step| step.status == ChainStepStatus::Rejected);
        let all_approved = steps
            .iter()
            .all(|step| step.status == ChainStepStatus::Approved);
        let current_step = steps
            .iter()
            .filter(|step| !step.status.is_terminal())
            .map(|step| step.step_order)
            .min();
        let current_steps = current_step.map_or_else(Vec::new, |order| {
            steps
                .iter()
                .filter(|step| step.step_order == order)
                .cloned()
                .collect()
        });

        let guard = self.lock();
        let template_name: String = guard
            .query_row(
                "SELECT name FROM chain_templates WHERE id = ?1",
                params![steps[0].template_id.as_str()],
                |row| row.get(0),
            )
            .map_err(io_err)?;

        Ok(Some(ChainProgress {
            total,
            completed,
            current_step,
            current_steps,
            all_approved,
            rejected,
            template_name,
        }))
    }

    fn count_active_steps(&self) -> Result<u64, ChainError> {
        let guard = self.lock();
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(1) FROM chain_steps WHERE status = 'active'",
                params![],
                |row| row.get(0),
            )
            .map_err(io_err)?;
        Ok(u64::try_from(count.max(0)).unwrap_or(0))
    }

    fn decide_step(
        &self,
        input: DecideStepInput,
    ) -> Result<Option<StepDecisionOutcome>, ChainError> {
        if input.status != ChainStepStatus::Approved && input.status != ChainStepStatus::Rejected {
            return Err(ChainError::Io(
                "decide_step requires Approved or Rejected".to_string(),
            ));
        }

        let mut guard = self.lock();
        let tx = guard.transaction().map_err(io_err)?;

        let changed = tx
            .execute(
                "UPDATE chain_steps SET status = ?1, decider_id = ?2, decider_note = ?3, \
                 decided_at = ?4 WHERE id = ?5 AND status = 'active'",
                params![
                    chain_step_status_to_str(input.status),
                    input.decider_id.as_str(),
                    input.note,
                    input.decided_at.to_rfc3339(),
                    input.step_id.as_str(),
                ],
            )
            .map_err(io_err)?;
        if changed == 0 {
            tx.commit().map_err(io_err)?;
            return Ok(None);
        }

        let raw = tx
            .query_row(
                &format!("SELECT {STEP_COLUMNS} FROM chain_steps WHERE id = ?1"),
                params![input.step_id.as_str()],
                row_to_raw_step,
            )
            .map_err(io_err)?;
        let decided_step = decode_step(raw)?;

        let outcome = if input.status == ChainStepStatus::Rejected {
            tx.execute(
                "UPDATE chain_steps SET status = 'skipped' \
                 WHERE approval_id = ?1 AND id != ?2 AND status IN ('pending', 'active')",
                params![decided_step.approval_id.as_str(), input.step_id.as_str()],
            )
            .map_err(io_err)?;
            StepDecisionOutcome {
                step: decided_step,
                advanced: false,
                all_approved: false,
                rejected: true,
            }
        } else {
            let remaining_siblings: i64 = tx
                .query_row(
                    "SELECT COUNT(1) FROM chain_steps \
                     WHERE approval_id = ?1 AND step_order = ?2 AND status = 'active'",
                    params![decided_step.approval_id.as_str(), decided_step.step_order],
                    |row| row.get(0),
                )
                .map_err(io_err)?;

            if remaining_siblings > 0 {
                StepDecisionOutcome {
                    step: decided_step,
                    advanced: false,
                    all_approved: false,
                    rejected: false,
                }
            } else {
                let next_order: Option<i64> = tx
                    .query_row(
                        "SELECT MIN(step_order) FROM chain_steps \
                         WHERE approval_id = ?1 AND status = 'pending'",
                        params![decided_step.approval_id.as_str()],
                        |row| row.get::<_, Option<i64>>(0),
                    )
                    .map_err(io_err)?;

                if let Some(next_order) = next_order {
                    tx.execute(
                        "UPDATE chain_steps SET status = 'active' \
                         WHERE approval_id = ?1 AND step_order = ?2 AND status = 'pending'",
                        params![decided_step.approval_id.as_str(), next_order],
                    )
                    .map_err(io_err)?;
                    StepDecisionOutcome {
                        step: decided_step,
                        advanced: true,
                        all_approved: false,
                        rejected: false,
                    }
                } else {
                    StepDecisionOutcome {
                        step: decided_step,
                        advanced: false,
                        all_approved: true,
                        rejected: false,
                    }
                }
            }
        };

        tx.commit().map_err(io_err)?;
        Ok(Some(outcome))
    }

    fn readiness(&self) -> Result<(), ChainError> {
        let guard = self.lock();
        guard
            .query_row("SELECT 1", params![], |_| Ok(()))
            .map_err(io_err)
    }
}
