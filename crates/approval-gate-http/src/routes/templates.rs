// crates/approval-gate-http/src/routes/templates.rs
// ============================================================================
// Module: Chain Template Endpoints
// Description: CRUD over chain templates, per §6's chain-templates routes.
// Purpose: Reads are open to any authenticated principal; writes require
// admin, and the default template is immutable (enforced by the store,
// surfaced here as 403).
// Dependencies: axum, approval_gate_core
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use serde_json::json;

use approval_gate_core::ChainStore;
use approval_gate_core::ChainTemplateStep;
use approval_gate_core::CreateTemplateInput;
use approval_gate_core::TemplateId;

use crate::auth::Principal;
use crate::dto::ChainTemplateRequest;
use crate::dto::ChainTemplateView;
use crate::error::ApiError;
use crate::state::AppState;

fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "only an admin may manage chain templates".to_string(),
        ))
    }
}

fn to_core_steps(steps: Vec<crate::dto::ChainTemplateStepInput>) -> Vec<ChainTemplateStep> {
    steps
        .into_iter()
        .map(|step| ChainTemplateStep {
            order: step.order,
            required_role: step.required_role,
            label: step.label,
        })
        .collect()
}

/// `GET /chain-templates`
///
/// # Errors
///
/// Returns [`ApiError::DurableFailure`] on a store I/O error.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = Arc::clone(&state);
    let templates = tokio::task::spawn_blocking(move || state.store.list_templates())
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    let views: Vec<ChainTemplateView> = templates.into_iter().map(ChainTemplateView::from).collect();
    Ok(Json(json!({ "data": { "templates": views } })))
}

/// `GET /chain-templates/:id`
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] when the template does not exist.
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let template_id = TemplateId::new(id);
    let state = Arc::clone(&state);
    let found = tokio::task::spawn_blocking(move || state.store.get_template(&template_id))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    let template = found.ok_or_else(|| ApiError::NotFound("chain template not found".to_string()))?;
    Ok(Json(json!({ "data": ChainTemplateView::from(template) })))
}

/// `POST /chain-templates` (admin only)
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for a non-admin caller, or
/// [`ApiError::Validation`] when step orders are not a contiguous range.
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<ChainTemplateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&principal)?;
    let input = CreateTemplateInput {
        id: None,
        name: body.name,
        description: body.description,
        steps: to_core_steps(body.steps),
    };
    let state = Arc::clone(&state);
    let template = tokio::task::spawn_blocking(move || state.store.create_template(input))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    Ok(Json(json!({ "data": ChainTemplateView::from(template) })))
}

/// `PUT /chain-templates/:id` (admin only; default template rejected)
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for the default template or a non-admin
/// caller.
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(body): Json<ChainTemplateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&principal)?;
    let template_id = TemplateId::new(id);
    let input = CreateTemplateInput {
        id: Some(template_id.clone()),
        name: body.name,
        description: body.description,
        steps: to_core_steps(body.steps),
    };
    let state = Arc::clone(&state);
    let template =
        tokio::task::spawn_blocking(move || state.store.update_template(&template_id, input))
            .await
            .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    Ok(Json(json!({ "data": ChainTemplateView::from(template) })))
}

/// `DELETE /chain-templates/:id` (admin only; default rejected; in-use rejected)
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for the default template,
/// [`ApiError::IllegalTransition`] when a non-terminal chain references it,
/// or [`ApiError::Forbidden`] for a non-admin caller.
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&principal)?;
    let template_id = TemplateId::new(id);
    let state = Arc::clone(&state);
    tokio::task::spawn_blocking(move || state.store.delete_template(&template_id))
        .await
        .map_err(|err| ApiError::DurableFailure(err.to_string()))??;
    Ok(Json(json!({ "data": { "deleted": true } })))
}
