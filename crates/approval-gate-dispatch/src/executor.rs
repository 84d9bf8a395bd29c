// crates/approval-gate-dispatch/src/executor.rs
// ============================================================================
// Module: Dispatch Executor
// Description: Drives an approved approval's plan steps to terminal dispatch.
// Purpose: Sequential per-step dispatch with retry, skip-reason reporting,
// and a uniform overall result shape, per §4.5.
// Dependencies: approval_gate_core
// ============================================================================

//! ## Overview
//! [`dispatch_approval`] atomically claims an approved approval via
//! `consume_for_dispatch`, then walks its plan steps in order, attempting
//! each ready step against its connector's registered handler under that
//! connector's retry policy. Dispatch is strictly sequential within one
//! approval; callers parallelize across approvals, not within one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use approval_gate_core::ApprovalId;
use approval_gate_core::ApprovalRecord;
use approval_gate_core::ApprovalStore;
use approval_gate_core::DispatchContext;
use approval_gate_core::PlanStep;
use approval_gate_core::PlanStepStatus;
use approval_gate_core::StepResult;
use approval_gate_core::StepResultStatus;
use approval_gate_core::StoreError;
use approval_gate_core::Timestamp;

use crate::registry::DispatcherRegistry;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// The result of running [`dispatch_approval`] to completion.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Per-step results, in plan order.
    pub results: Vec<StepResult>,
    /// `true` iff no step resolved to `status = "failed"`.
    pub success: bool,
    /// Human-readable `"N dispatched, M failed, K skipped"` summary.
    pub summary: String,
    /// The approval record after the terminal `mark_dispatched` /
    /// `mark_dispatch_failed` transition.
    pub approval: ApprovalRecord,
}

/// Why [`dispatch_approval`] could not run at all.
#[derive(Debug, thiserror::Error)]
pub enum DispatchExecutorError {
    /// The approval could not be atomically claimed for dispatch; the
    /// caller should surface 409 with a reason derived from its current
    /// status (`"already rejected"`, `"already dispatched"`, `"not
    /// approved"`, …).
    #[error("approval is not claimable for dispatch")]
    NotClaimable,
    /// The durable store failed underneath the executor.
    #[error("dispatch store error: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Runs the dispatch sequence for `approval_id` against `registry`.
///
/// # Errors
///
/// Returns [`DispatchExecutorError::NotClaimable`] when the approval is not
/// currently `approved` (someone else dispatched, rejected, or expired it
/// first). Returns [`DispatchExecutorError::Store`] on underlying
/// durability failure.
pub fn dispatch_approval<S: ApprovalStore>(
    store: &S,
    registry: &DispatcherRegistry,
    approval_id: &ApprovalId,
    dry_run: bool,
) -> Result<DispatchOutcome, DispatchExecutorError> {
    let claimed = store
        .consume_for_dispatch(approval_id)
        .map_err(DispatchExecutorError::Store)?
        .ok_or(DispatchExecutorError::NotClaimable)?;

    let context = DispatchContext {
        approval_id: claimed.id.clone(),
        request_id: claimed.request_id.clone(),
        operator_id: claimed.operator_id.clone(),
        dry_run,
    };

    let results = run_plan(&claimed, registry, &context);

    let failed = results
        .iter()
        .filter(|result| result.status == StepResultStatus::Failed)
        .count();
    let skipped = results
        .iter()
        .filter(|result| result.status == StepResultStatus::Skipped)
        .count();
    let dispatched = results.len() - failed - skipped;
    let success = failed == 0;
    let summary = format!("{dispatched} dispatched, {failed} failed, {skipped} skipped");

    let overall_result = serde_json::json!({
        "summary": summary,
        "steps": results,
    });

    let approval = if success {
        store
            .mark_dispatched(approval_id, overall_result, Timestamp::now())
            .map_err(DispatchExecutorError::Store)?
            .ok_or(DispatchExecutorError::NotClaimable)?
    } else {
        store
            .mark_dispatch_failed(approval_id, overall_result, Timestamp::now())
            .map_err(DispatchExecutorError::Store)?
            .ok_or(DispatchExecutorError::NotClaimable)?
    };

    Ok(DispatchOutcome {
        results,
        success,
        summary,
        approval,
    })
}

/// Walks `approval`'s plan steps in order, producing one [`StepResult`] per
/// step. Never fails: unregistered connectors and handler errors surface as
/// `Skipped`/`Failed` results rather than propagating.
fn run_plan(
    approval: &ApprovalRecord,
    registry: &DispatcherRegistry,
    context: &DispatchContext,
) -> Vec<StepResult> {
    approval
        .plan_steps
        .iter()
        .map(|step| {
            if step.status != PlanStepStatus::Ready {
                return skipped(step, format!("already {}", step.status.as_str()));
            }
            if step.has_no_connector() {
                return skipped(step, "No connector configured".to_string());
            }
            let Some(handler) = registry.get(&step.connector) else {
                return skipped(step, "No dispatcher registered".to_string());
            };

            match handler.health_check() {
                Ok(health) if !health.healthy => {
                    let detail = health.detail.unwrap_or_else(|| "handler reported unhealthy".to_string());
                    return failed(step, detail);
                }
                Ok(_) => {}
                Err(err) => return failed(step, err.to_string()),
            }

            let policy = registry.get_retry_policy(&step.connector);
            let mut attempt = 1;
            loop {
                let outcome = handler.dispatch(step, context);
                let result = match outcome {
                    Ok(result) => result,
                    Err(err) => StepResult {
                        step_id: step.step_id.clone(),
                        connector: step.connector.clone(),
                        status: StepResultStatus::Failed,
                        result: None,
                        error: Some(err.to_string()),
                        completed_at: Timestamp::now(),
                    },
                };
                if result.status != StepResultStatus::Failed || attempt >= policy.max_attempts {
                    break result;
                }
                let delay_ms = policy.backoff_delay_ms(attempt);
                tracing::warn!(
                    step_id = %step.step_id,
                    connector = %step.connector,
                    attempt,
                    delay_ms,
                    "dispatch attempt failed, retrying"
                );
                thread::sleep(Duration::from_millis(delay_ms));
                attempt += 1;
            }
        })
        .collect()
}

/// Builds a synthesized `Skipped` step result with the given reason.
fn skipped(step: &PlanStep, reason: String) -> StepResult {
    StepResult {
        step_id: step.step_id.clone(),
        connector: step.connector.clone(),
        status: StepResultStatus::Skipped,
        result: None,
        error: Some(reason),
        completed_at: Timestamp::now(),
    }
}

/// Builds a synthesized `Failed` step result with the given reason, used
/// when a handler's health check fails before any dispatch attempt is made.
fn failed(step: &PlanStep, reason: String) -> StepResult {
    StepResult {
        step_id: step.step_id.clone(),
        connector: step.connector.clone(),
        status: StepResultStatus::Failed,
        result: None,
        error: Some(reason),
        completed_at: Timestamp::now(),
    }
}
