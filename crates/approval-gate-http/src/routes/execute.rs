// crates/approval-gate-http/src/routes/execute.rs
// ============================================================================
// Module: Execute Endpoint
// Description: `POST /pj/execute`, the single submission entry point that
// either gates a plan behind an approval or runs it immediately.
// Purpose: Authorize, deduplicate, and either create a governed approval
// (and its default chain) or dispatch a launch/dry-run plan directly.
// Dependencies: axum, approval_gate_authz, approval_gate_core,
// approval_gate_dispatch, uuid
// ============================================================================

//! ## Overview
//! `mode` alone decides the path: `execute` is the only mode that creates an
//! [`approval_gate_core::ApprovalRecord`] and is subject to [`evaluate`];
//! `launch` and `dry-run` call connector handlers directly and never touch
//! the approval or idempotency stores. A caller-supplied `requestId` is
//! deduplicated via [`classify_lookup`]; a prior submission with a matching
//! `schemaVersion` replays its stored response body verbatim.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;

use approval_gate_authz::AuthorizationQuery;
use approval_gate_authz::evaluate;
use approval_gate_core::ApprovalStore;
use approval_gate_core::ChainStore;
use approval_gate_core::ConnectorName;
use approval_gate_core::CreateApprovalInput;
use approval_gate_core::DEFAULT_TEMPLATE_ID;
use approval_gate_core::DispatchContext;
use approval_gate_core::IdempotencyEntry;
use approval_gate_core::IdempotencyKey;
use approval_gate_core::IdempotencyLookup;
use approval_gate_core::IdempotencyStore;
use approval_gate_core::PlanStep;
use approval_gate_core::RequestId;
use approval_gate_core::StepResult;
use approval_gate_core::StepResultStatus;
use approval_gate_core::TemplateId;
use approval_gate_core::Timestamp;
use approval_gate_core::classify_lookup;
use approval_gate_core::plan_hash;
use approval_gate_metrics::catalog;

use crate::auth::Principal;
use crate::dto::ExecuteMode;
use crate::dto::ExecuteRequest;
use crate::dto::PlanStepInput;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /pj/execute`
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] when the operator is not authorized for
/// `actionIntent`, [`ApiError::DuplicateRequest`] when `requestId` collides
/// with a different plan, or [`ApiError::DurableFailure`] on underlying
/// store I/O.
pub async fn execute(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<ExecuteRequest>,
) -> Result<Response, ApiError> {
    match body.mode {
        ExecuteMode::Launch | ExecuteMode::DryRun => {
            Ok(run_ungated(&state, &principal, &body).await?)
        }
        ExecuteMode::Execute => Ok(run_governed(state, principal, body).await?),
    }
}

async fn run_ungated(
    state: &Arc<AppState>,
    principal: &Principal,
    body: &ExecuteRequest,
) -> Result<Response, ApiError> {
    let dry_run = matches!(body.mode, ExecuteMode::DryRun);
    let plan_steps = build_plan_steps(&body.plan_steps);
    let request_id = RequestId::new(body.request_id.clone().unwrap_or_else(new_request_id));
    let context = DispatchContext {
        approval_id: approval_gate_core::ApprovalId::new(format!("ungated-{request_id}")),
        request_id,
        operator_id: principal.operator_id.clone(),
        dry_run,
    };
    let state = Arc::clone(state);
    let results = tokio::task::spawn_blocking(move || {
        dispatch_directly(&state.registry, &plan_steps, &context)
    })
    .await
    .map_err(|err| ApiError::DurableFailure(err.to_string()))?;
    let failed = results.iter().filter(|r| r.status == StepResultStatus::Failed).count();
    Ok(Json(json!({
        "success": failed == 0,
        "data": { "steps": results },
    }))
    .into_response())
}

async fn run_governed(
    state: Arc<AppState>,
    principal: Principal,
    body: ExecuteRequest,
) -> Result<Response, ApiError> {
    let request_id = RequestId::new(body.request_id.clone().unwrap_or_else(new_request_id));
    let idempotency_key = IdempotencyKey::new(
        principal.operator_id.clone(),
        principal.tenant_id.clone(),
        request_id.clone(),
    );

    let existing = {
        let state = Arc::clone(&state);
        let key = idempotency_key.clone();
        tokio::task::spawn_blocking(move || state.store.find(&key))
            .await
            .map_err(|err| ApiError::DurableFailure(err.to_string()))??
    };

    match classify_lookup(existing.as_ref(), body.schema_version) {
        IdempotencyLookup::Replay => {
            #[allow(clippy::unwrap_used, reason = "Replay is only reachable when `existing` is Some.")]
            let entry = existing.unwrap();
            let status = StatusCode::from_u16(entry.status_code).unwrap_or(StatusCode::OK);
            return Ok((status, Json(entry.result_json)).into_response());
        }
        IdempotencyLookup::SchemaMismatch => {
            return Err(ApiError::Validation(
                "request_id was already used with a different schema_version".to_string(),
            ));
        }
        IdempotencyLookup::Fresh => {}
    }

    let intent = approval_gate_core::ActionIntent::new(body.action_intent.clone());
    let connectors: Vec<ConnectorName> = body
        .plan_steps
        .iter()
        .map(|step| ConnectorName::new(step.connector.clone()))
        .collect();
    let now = Timestamp::now();
    let query = AuthorizationQuery {
        operator_id: principal.operator_id.clone(),
        permissions: principal.permissions.clone(),
        delegations: principal.delegations.clone(),
        intent: intent.clone(),
        connectors,
        now,
    };
    let decision = evaluate(&query);
    if !decision.allowed {
        return Err(ApiError::Forbidden(
            decision.reason.unwrap_or_else(|| "not authorized".to_string()),
        ));
    }

    let plan_steps = build_plan_steps(&body.plan_steps);
    let plan_hash_value = plan_hash(&plan_steps).map_err(|err| ApiError::Validation(err.to_string()))?;
    let ttl_seconds = body
        .ttl_seconds
        .unwrap_or(approval_gate_core::ApprovalRecord::DEFAULT_TTL_SECONDS);
    let decision_result = serde_json::to_value(&decision).unwrap_or(serde_json::Value::Null);

    let input = CreateApprovalInput {
        request_id: request_id.clone(),
        operator_id: principal.operator_id.clone(),
        workspace_id: principal.workspace_id.clone(),
        tenant_id: principal.tenant_id.clone(),
        municipality_id: principal.municipality_id.clone(),
        action_intent: intent,
        action_mode: approval_gate_core::ActionMode::Governed,
        plan_steps,
        audit_record: body.audit_record.clone(),
        decision_result,
        ttl_seconds,
        created_at: now,
    };

    let state_for_create = Arc::clone(&state);
    let approval = tokio::task::spawn_blocking(move || state_for_create.store.create(input))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;

    let template_id = TemplateId::new(DEFAULT_TEMPLATE_ID.to_string());
    let approval_id = approval.id.clone();
    let state_for_chain = Arc::clone(&state);
    tokio::task::spawn_blocking(move || {
        ChainStore::create_chain_for_approval(&state_for_chain.store, &approval_id, &template_id, now)
    })
    .await
    .map_err(|err| ApiError::DurableFailure(err.to_string()))??;

    let body_json = json!({
        "success": true,
        "approvalRequired": true,
        "approvalId": approval.id.as_str(),
        "approvalStatus": approval.approval_status,
    });
    let entry = IdempotencyEntry {
        key: idempotency_key,
        schema_version: body.schema_version,
        result_json: body_json.clone(),
        status_code: StatusCode::ACCEPTED.as_u16(),
        created_at: now,
    };
    let state_for_idem = Arc::clone(&state);
    tokio::task::spawn_blocking(move || state_for_idem.store.put(entry))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;

    let _ = state.metrics.increment(catalog::APPROVALS_CREATED_TOTAL, 1.0);
    Ok((StatusCode::ACCEPTED, Json(body_json)).into_response())
}

fn build_plan_steps(inputs: &[PlanStepInput]) -> Vec<PlanStep> {
    inputs
        .iter()
        .map(|input| {
            PlanStep::new(
                input.step_id.clone(),
                input.description.clone(),
                input.connector.clone(),
                input.plan.clone(),
            )
        })
        .collect()
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn dispatch_directly(
    registry: &approval_gate_dispatch::DispatcherRegistry,
    plan_steps: &[PlanStep],
    context: &DispatchContext,
) -> Vec<StepResult> {
    plan_steps
        .iter()
        .map(|step| {
            if step.has_no_connector() {
                return StepResult {
                    step_id: step.step_id.clone(),
                    connector: step.connector.clone(),
                    status: StepResultStatus::Skipped,
                    result: None,
                    error: Some("No connector configured".to_string()),
                    completed_at: Timestamp::now(),
                };
            }
            let Some(handler) = registry.get(&step.connector) else {
                return StepResult {
                    step_id: step.step_id.clone(),
                    connector: step.connector.clone(),
                    status: StepResultStatus::Skipped,
                    result: None,
                    error: Some("No dispatcher registered".to_string()),
                    completed_at: Timestamp::now(),
                };
            };
            handler.dispatch(step, context).unwrap_or_else(|err| StepResult {
                step_id: step.step_id.clone(),
                connector: step.connector.clone(),
                status: StepResultStatus::Failed,
                result: None,
                error: Some(err.to_string()),
                completed_at: Timestamp::now(),
            })
        })
        .collect()
}
