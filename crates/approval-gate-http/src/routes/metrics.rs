// crates/approval-gate-http/src/routes/metrics.rs
// ============================================================================
// Module: Metrics Endpoint
// Description: `GET /metrics` Prometheus text-exposition handler.
// Purpose: Expose the fixed catalog of §4.6 in standard exposition format,
// gated by an optional scrape token rather than the bearer-principal
// middleware (Prometheus scrapers do not carry operator JWTs).
// Dependencies: axum, approval_gate_metrics
// ============================================================================

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

use approval_gate_metrics::catalog;

use crate::state::AppState;

/// Renders the Prometheus text-exposition body, enforcing
/// `metrics.scrape_token` when configured.
pub async fn metrics(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(expected) = &state.config.metrics.scrape_token {
        let presented = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    let body = state.metrics.prometheus(&catalog::help_table());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}
