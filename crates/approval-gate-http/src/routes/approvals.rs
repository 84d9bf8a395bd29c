// crates/approval-gate-http/src/routes/approvals.rs
// ============================================================================
// Module: Approval Endpoints
// Description: List, fetch, decide, and dispatch handlers over
// `ApprovalRecord`, including chain-aware decision propagation.
// Purpose: The operator-facing surface of the approval lifecycle, once a
// governed submission has created a record via `/pj/execute`.
// Dependencies: axum, approval_gate_core, approval_gate_dispatch
// ============================================================================

//! ## Overview
//! [`decide`] resolves a chain step when the approval has one: no `stepId`
//! is only unambiguous when exactly one step is currently active, which is
//! always true for the single-step default template. A step decision that
//! rejects or completes the chain drives the approval's own status via
//! [`approval_gate_core::ApprovalStore::decide`]; any other outcome leaves
//! the approval `pending` and reports `chainAdvanced` instead. [`dispatch`]
//! reads the approval's pre-dispatch status so a lost compare-and-set race
//! can be reported with a status-specific reason rather than a bare 409.

use std::sync::Arc;

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;

use approval_gate_core::ApprovalId;
use approval_gate_core::ApprovalQuery;
use approval_gate_core::ApprovalStatus;
use approval_gate_core::ApprovalStore;
use approval_gate_core::ChainStepStatus;
use approval_gate_core::ChainStore;
use approval_gate_core::DecideApprovalInput;
use approval_gate_core::DecideStepInput;
use approval_gate_core::StepId;
use approval_gate_core::Timestamp;
use approval_gate_dispatch::DispatchExecutorError;
use approval_gate_dispatch::dispatch_approval;
use approval_gate_metrics::catalog;

use crate::auth::Principal;
use crate::dto::ApprovalView;
use crate::dto::DecideRequest;
use crate::dto::DecideStatus;
use crate::dto::DispatchRequest;
use crate::dto::ListApprovalsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /approvals`
///
/// Non-admin operators see only their own approvals regardless of what
/// `operatorId` they might ask for; an admin sees every tenant's rows.
///
/// # Errors
///
/// Returns [`ApiError::DurableFailure`] on underlying store I/O.
pub async fn list_approvals(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(params): Query<ListApprovalsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = ApprovalQuery {
        approval_status: params.status,
        operator_id: if principal.is_admin {
            None
        } else {
            Some(principal.operator_id.clone())
        },
        limit: params.limit,
        offset: params.offset,
    };
    let state = Arc::clone(&state);
    let records = tokio::task::spawn_blocking(move || state.store.query(&query))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    let tenant_id = principal.tenant_id.clone();
    let views: Vec<ApprovalView> = records
        .into_iter()
        .filter(|record| principal.is_admin || record.tenant_id == tenant_id)
        .map(ApprovalView::from)
        .collect();
    Ok(Json(json!({ "data": { "approvals": views } })))
}

/// `GET /approvals/count/pending`
///
/// # Errors
///
/// Returns [`ApiError::DurableFailure`] on underlying store I/O.
pub async fn count_pending(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = Arc::clone(&state);
    let count = tokio::task::spawn_blocking(move || state.store.count_pending())
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    Ok(Json(json!({ "data": { "pendingCount": count } })))
}

/// `GET /approvals/:id`
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] when the approval does not exist, or
/// [`ApiError::Forbidden`] when a non-admin caller does not own it.
pub async fn get_approval(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let approval_id = ApprovalId::new(id);
    let state = Arc::clone(&state);
    let record = tokio::task::spawn_blocking(move || state.store.find_by_id(&approval_id))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    let record = record.ok_or_else(|| ApiError::NotFound("approval not found".to_string()))?;
    if !principal.is_admin && principal.operator_id != record.operator_id {
        return Err(ApiError::Forbidden(
            "operator does not own this approval".to_string(),
        ));
    }
    Ok(Json(json!({ "data": ApprovalView::from(record) })))
}

/// `POST /approvals/:id/decide`
///
/// When the approval has an instantiated chain, resolves the step named by
/// `stepId` (or the sole currently-active step, if exactly one exists) and
/// propagates rejection or full-chain approval onto the approval record
/// itself; a step decision that leaves the chain mid-flight reports
/// `chainAdvanced` instead of changing `approvalStatus`. An approval with no
/// chain is decided directly.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] when the approval (or named step) does not
/// exist, [`ApiError::Forbidden`] for a non-admin, non-owning caller,
/// [`ApiError::Validation`] when `stepId` is omitted and more than one step
/// is active, or [`ApiError::ConsumeCasConflict`] when the approval or step
/// was already decided by a racing caller.
pub async fn decide(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(body): Json<DecideRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let approval_id = ApprovalId::new(id);
    let now = Timestamp::now();
    let decider_id = principal.operator_id.clone();
    let note = body.note.clone();
    let status = body.status;

    let state_for_lookup = Arc::clone(&state);
    let approval_id_for_lookup = approval_id.clone();
    let record = tokio::task::spawn_blocking(move || {
        state_for_lookup.store.find_by_id(&approval_id_for_lookup)
    })
    .await
    .map_err(|err| ApiError::DurableFailure(err.to_string()))??
    .ok_or_else(|| ApiError::NotFound("approval not found".to_string()))?;

    if !principal.is_admin && principal.operator_id != record.operator_id {
        return Err(ApiError::Forbidden(
            "operator does not own this approval".to_string(),
        ));
    }

    let state_for_steps = Arc::clone(&state);
    let approval_id_for_steps = approval_id.clone();
    let existing_steps =
        tokio::task::spawn_blocking(move || state_for_steps.store.get_steps_for_approval(&approval_id_for_steps))
            .await
            .map_err(|err| ApiError::DurableFailure(err.to_string()))??;

    if existing_steps.is_empty() {
        let input = DecideApprovalInput {
            approval_id: approval_id.clone(),
            approver_id: decider_id,
            status: decide_status_to_approval_status(status),
            note,
            decided_at: now,
        };
        let state_for_decide = Arc::clone(&state);
        let decided = tokio::task::spawn_blocking(move || state_for_decide.store.decide(input))
            .await
            .map_err(|err| ApiError::DurableFailure(err.to_string()))??
            .ok_or_else(|| {
                ApiError::ConsumeCasConflict("approval was already decided".to_string())
            })?;
        record_decision_metrics(&state, status);
        return Ok(Json(json!({ "data": ApprovalView::from(decided) })));
    }

    let step_id = resolve_step_id(&state, &approval_id, body.step_id.as_deref(), &existing_steps).await?;

    let input = DecideStepInput {
        step_id,
        decider_id: decider_id.clone(),
        status: decide_status_to_step_status(status),
        note,
        decided_at: now,
    };
    let state_for_step = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || state_for_step.store.decide_step(input))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??
        .ok_or_else(|| ApiError::ConsumeCasConflict("chain step was already decided".to_string()))?;

    let _ = state
        .metrics
        .increment(catalog::APPROVAL_CHAIN_STEP_DECIDED_TOTAL, 1.0);

    if outcome.rejected || outcome.all_approved {
        let decide_status = if outcome.rejected {
            ApprovalStatus::Rejected
        } else {
            ApprovalStatus::Approved
        };
        let input = DecideApprovalInput {
            approval_id: approval_id.clone(),
            approver_id: decider_id,
            status: decide_status,
            note: None,
            decided_at: now,
        };
        let state_for_propagate = Arc::clone(&state);
        let propagated = tokio::task::spawn_blocking(move || state_for_propagate.store.decide(input))
            .await
            .map_err(|err| ApiError::DurableFailure(err.to_string()))??
            .ok_or_else(|| {
                ApiError::ConsumeCasConflict("approval was already decided".to_string())
            })?;
        if outcome.rejected {
            let _ = state.metrics.increment(catalog::APPROVAL_CHAIN_REJECTED_TOTAL, 1.0);
            let _ = state.metrics.increment(catalog::APPROVALS_REJECTED_TOTAL, 1.0);
        } else {
            let _ = state.metrics.increment(catalog::APPROVAL_CHAIN_COMPLETED_TOTAL, 1.0);
            let _ = state.metrics.increment(catalog::APPROVALS_APPROVED_TOTAL, 1.0);
        }
        return Ok(Json(json!({ "data": ApprovalView::from(propagated) })));
    }

    Ok(Json(json!({
        "data": ApprovalView::from(record),
        "chainAdvanced": outcome.advanced,
    })))
}

fn decide_status_to_approval_status(status: DecideStatus) -> ApprovalStatus {
    match status {
        DecideStatus::Approved => ApprovalStatus::Approved,
        DecideStatus::Rejected => ApprovalStatus::Rejected,
    }
}

fn decide_status_to_step_status(status: DecideStatus) -> ChainStepStatus {
    match status {
        DecideStatus::Approved => ChainStepStatus::Approved,
        DecideStatus::Rejected => ChainStepStatus::Rejected,
    }
}

fn record_decision_metrics(state: &Arc<AppState>, status: DecideStatus) {
    let series = match status {
        DecideStatus::Approved => catalog::APPROVALS_APPROVED_TOTAL,
        DecideStatus::Rejected => catalog::APPROVALS_REJECTED_TOTAL,
    };
    let _ = state.metrics.increment(series, 1.0);
}

/// Resolves which chain step a `stepId`-less decide call targets: the sole
/// currently-active step. An explicit `stepId` is validated against
/// `existing_steps` instead of trusting the caller's approval scoping.
async fn resolve_step_id(
    state: &Arc<AppState>,
    approval_id: &ApprovalId,
    requested: Option<&str>,
    existing_steps: &[approval_gate_core::ChainStepInstance],
) -> Result<StepId, ApiError> {
    match requested {
        Some(raw) => {
            let step_id = StepId::new(raw.to_string());
            let belongs = existing_steps.iter().any(|step| step.id == step_id);
            if !belongs {
                return Err(ApiError::NotFound(
                    "chain step not found for this approval".to_string(),
                ));
            }
            Ok(step_id)
        }
        None => {
            let state_for_active = Arc::clone(state);
            let approval_id_for_active = approval_id.clone();
            let active = tokio::task::spawn_blocking(move || {
                state_for_active.store.get_active_steps(&approval_id_for_active)
            })
            .await
            .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
            match active.as_slice() {
                [single] => Ok(single.id.clone()),
                [] => Err(ApiError::IllegalTransition(
                    "no chain step is currently active".to_string(),
                )),
                _ => Err(ApiError::Validation(
                    "stepId is required when more than one chain step is active".to_string(),
                )),
            }
        }
    }
}

/// `POST /approvals/:id/dispatch`
///
/// Re-reads the approval's pre-dispatch status so a lost compare-and-set
/// race is reported with a reason matching that status, not a bare 409.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] when the approval does not exist, or
/// [`ApiError::ConsumeCasConflict`] when the approval is not currently
/// `approved`.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<String>,
    Json(body): Json<DispatchRequest>,
) -> Result<Response, ApiError> {
    let approval_id = ApprovalId::new(id);

    let state_for_lookup = Arc::clone(&state);
    let approval_id_for_lookup = approval_id.clone();
    let pre_status = tokio::task::spawn_blocking(move || {
        state_for_lookup.store.find_by_id(&approval_id_for_lookup)
    })
    .await
    .map_err(|err| ApiError::DurableFailure(err.to_string()))??
    .ok_or_else(|| ApiError::NotFound("approval not found".to_string()))?
    .approval_status;

    let state_for_dispatch = Arc::clone(&state);
    let approval_id_for_dispatch = approval_id.clone();
    let dry_run = body.dry_run;
    let outcome = tokio::task::spawn_blocking(move || {
        dispatch_approval(
            &state_for_dispatch.store,
            &state_for_dispatch.registry,
            &approval_id_for_dispatch,
            dry_run,
        )
    })
    .await
    .map_err(|err| ApiError::DurableFailure(err.to_string()))?;

    match outcome {
        Ok(outcome) => {
            let _ = state
                .metrics
                .increment(catalog::APPROVAL_CONSUME_CAS_SUCCESS_TOTAL, 1.0);
            if outcome.success {
                let _ = state
                    .metrics
                    .increment(catalog::APPROVAL_DISPATCH_SUCCESS_TOTAL, 1.0);
            } else {
                let _ = state
                    .metrics
                    .increment(catalog::APPROVAL_DISPATCH_FAILURE_TOTAL, 1.0);
            }
            let body = json!({
                "success": outcome.success,
                "summary": outcome.summary,
                "data": ApprovalView::from(outcome.approval),
            });
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        Err(DispatchExecutorError::NotClaimable) => {
            let _ = state
                .metrics
                .increment(catalog::APPROVAL_CONSUME_CAS_CONFLICT_TOTAL, 1.0);
            let reason = not_claimable_reason(pre_status);
            Err(ApiError::ConsumeCasConflict(reason.to_string()))
        }
        Err(DispatchExecutorError::Store(err)) => Err(ApiError::from(err)),
    }
}

/// Maps an approval's pre-dispatch status to the human-readable reason a
/// lost `consume_for_dispatch` race should report.
fn not_claimable_reason(status: ApprovalStatus) -> &'static str {
    match status {
        ApprovalStatus::Pending => "not approved",
        ApprovalStatus::Rejected => "already rejected",
        ApprovalStatus::Expired => "already expired",
        ApprovalStatus::Dispatching => "dispatch already in progress",
        ApprovalStatus::Dispatched => "already dispatched",
        ApprovalStatus::DispatchFailed => "already attempted, dispatch failed",
        ApprovalStatus::Approved => "lost the race to another dispatch request",
    }
}
