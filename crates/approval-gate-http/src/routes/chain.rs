// crates/approval-gate-http/src/routes/chain.rs
// ============================================================================
// Module: Chain Progress Endpoint
// Description: `GET /approvals/:id/chain` handler.
// Purpose: Project a chain's progress and full step list for callers
// polling an in-review approval.
// Dependencies: axum, approval_gate_core
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use serde_json::json;

use approval_gate_core::ApprovalId;
use approval_gate_core::ApprovalStore;
use approval_gate_core::ChainStore;

use crate::auth::Principal;
use crate::dto::ChainProgressView;
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /approvals/:id/chain`
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] when the approval or its chain does not
/// exist, or [`ApiError::Forbidden`] when a non-admin caller does not own
/// the approval.
pub async fn get_chain(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let approval_id = ApprovalId::new(id);
    let state = Arc::clone(&state);
    let (approval, steps, progress) = tokio::task::spawn_blocking({
        let approval_id = approval_id.clone();
        move || {
            let approval = state.store.find_by_id(&approval_id)?;
            let steps = state.store.get_steps_for_approval(&approval_id).ok();
            let progress = state.store.get_chain_progress(&approval_id).ok().flatten();
            Ok::<_, approval_gate_core::StoreError>((approval, steps, progress))
        }
    })
    .await
    .map_err(|err| ApiError::DurableFailure(err.to_string()))??;

    let approval = approval.ok_or_else(|| ApiError::NotFound("approval not found".to_string()))?;
    if !principal.is_admin && principal.operator_id != approval.operator_id {
        return Err(ApiError::Forbidden(
            "operator does not own this approval".to_string(),
        ));
    }
    let progress = progress.ok_or_else(|| ApiError::NotFound("no chain exists for this approval".to_string()))?;
    let steps = steps.unwrap_or_default();
    let template_id = steps
        .first()
        .map(|step| step.template_id.clone().into_string())
        .unwrap_or_default();
    let view = ChainProgressView::new(progress, template_id, steps);
    Ok(Json(json!({ "data": view })))
}
