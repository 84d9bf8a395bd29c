// crates/approval-gate-http/src/routes/mod.rs
// ============================================================================
// Module: Route Assembly
// Description: Builds the full route table and applies the auth and CSRF
// middleware layers at the right nesting level.
// Purpose: Keep `/healthz`, `/readyz`, and `/metrics` reachable without a
// bearer token, gate every other route behind `auth::authenticate`, and gate
// the mutating subset of those behind the anti-CSRF marker header.
// Dependencies: axum
// ============================================================================

mod approvals;
mod chain;
mod execute;
mod health;
mod metrics;
mod templates;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;

use crate::auth;
use crate::csrf;
use crate::state::AppState;

/// Assembles the complete router: public probes, then an authenticated
/// surface with a CSRF-guarded mutation surface nested inside it.
pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(metrics::metrics));

    let mutations = Router::new()
        .route("/pj/execute", post(execute::execute))
        .route("/approvals/{id}/decide", post(approvals::decide))
        .route("/approvals/{id}/dispatch", post(approvals::dispatch))
        .route("/chain-templates", post(templates::create_template))
        .route("/chain-templates/{id}", put(templates::update_template))
        .route("/chain-templates/{id}", delete(templates::delete_template))
        .layer(middleware::from_fn(csrf::require_marker));

    let reads = Router::new()
        .route("/approvals", get(approvals::list_approvals))
        .route("/approvals/count/pending", get(approvals::count_pending))
        .route("/approvals/{id}", get(approvals::get_approval))
        .route("/approvals/{id}/chain", get(chain::get_chain))
        .route("/chain-templates", get(templates::list_templates))
        .route("/chain-templates/{id}", get(templates::get_template));

    let authenticated = mutations.merge(reads).layer(middleware::from_fn_with_state(
        Arc::clone(&state),
        auth::authenticate,
    ));

    public.merge(authenticated).with_state(state)
}
