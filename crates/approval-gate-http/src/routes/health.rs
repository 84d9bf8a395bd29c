// crates/approval-gate-http/src/routes/health.rs
// ============================================================================
// Module: Health Endpoints
// Description: `/healthz` (liveness) and `/readyz` (readiness) handlers.
// Purpose: Give orchestrators a cheap liveness probe and a readiness probe
// that actually reaches the durable store, per the ambient operational
// stack every deployed HTTP service in this corpus carries.
// Dependencies: axum
// ============================================================================

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Json;
use serde_json::json;

use approval_gate_core::ApprovalStore;
use approval_gate_core::ChainStore;
use approval_gate_core::IdempotencyStore;

use crate::state::AppState;

/// Liveness probe: the process is running and able to answer HTTP.
pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe: every durable dependency answers.
pub async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    let state = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || -> Result<(), String> {
        ApprovalStore::readiness(&state.store).map_err(|err| err.to_string())?;
        ChainStore::readiness(&state.store).map_err(|err| err.to_string())?;
        IdempotencyStore::readiness(&state.store).map_err(|err| err.to_string())?;
        Ok(())
    })
    .await;
    match outcome {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response(),
        Ok(Err(detail)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "detail": detail })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "detail": err.to_string() })),
        )
            .into_response(),
    }
}

type Response = axum::response::Response;
