// crates/approval-gate-http/src/lib.rs
// ============================================================================
// Module: Approval Gate HTTP
// Description: The axum HTTP surface over the approval lifecycle engine.
// Purpose: Wire the durable store, connector registry, JWT verifier, and
// metrics catalog into one router, per §6's external interface.
// Dependencies: axum, tower-http, approval_gate_core, approval_gate_config,
// approval_gate_dispatch, approval_gate_metrics, approval_gate_store_sqlite
// ============================================================================

//! # Approval Gate HTTP
//!
//! [`build_router`] assembles the full route table behind one
//! `State<Arc<AppState>>`: an unauthenticated probe/metrics surface, and an
//! authenticated surface gated by [`auth::authenticate`], with a further
//! CSRF-marker-gated mutation surface nested inside it. [`run`] is the
//! process entry point: it opens the durable store, wires the connector
//! registry, starts the background sweep, and serves until the process
//! receives a shutdown signal.

mod auth;
mod background;
mod connectors;
mod csrf;
mod dto;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use thiserror::Error;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use approval_gate_config::ServiceConfig;
use approval_gate_store_sqlite::SqliteStore;
use approval_gate_store_sqlite::SqliteStoreConfig;

pub use auth::AuthError;
pub use auth::JwtVerifier;
pub use auth::Principal;
pub use auth::Verifier;
pub use connectors::ConnectorConfigError;
pub use error::ApiError;
pub use state::AppState;

/// `Content-Security-Policy` applied to every response when
/// `CspConfig::overrides` is unset. This is a JSON API with no HTML
/// surface, so the default denies everything.
const DEFAULT_CSP: &str = "default-src 'none'; frame-ancestors 'none'";

/// Errors that can prevent the service from starting.
#[derive(Debug, Error)]
pub enum RunError {
    /// The durable store failed to open.
    #[error("failed to open durable store: {0}")]
    Store(#[from] approval_gate_store_sqlite::SqliteStoreError),
    /// A connector config entry was malformed or failed to construct.
    #[error("failed to wire connector registry: {0}")]
    Connectors(#[from] ConnectorConfigError),
    /// The configured bind address could not be parsed.
    #[error("invalid bind address {0:?}: {1}")]
    InvalidBindAddress(String, std::net::AddrParseError),
    /// The HTTP listener failed to bind or `axum::serve` failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds the full axum [`Router`] over an already-assembled [`AppState`].
///
/// Split out from [`run`] so integration tests can exercise the route table
/// directly with `tower::ServiceExt::oneshot` against an in-memory store.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.cors.trusted_origins);
    let body_limit = state.config.server.max_body_bytes;
    let csp = csp_header_value(state.config.csp.overrides.as_deref());

    let mut router = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(usize_from_bytes(body_limit)));
    if let Some(csp) = csp {
        router = router.layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CONTENT_SECURITY_POLICY,
            csp,
        ));
    }
    router
}

/// Parses `overrides` (or [`DEFAULT_CSP`] when absent) into a header value.
fn csp_header_value(overrides: Option<&str>) -> Option<axum::http::HeaderValue> {
    overrides.unwrap_or(DEFAULT_CSP).parse().ok()
}

/// Saturating `u64` -> `usize` conversion for `DefaultBodyLimit::max`.
fn usize_from_bytes(bytes: u64) -> usize {
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

/// Builds the CORS layer from `trusted_origins`, permissive when empty
/// (matching `tower_http`'s own default) and an explicit allow-list
/// otherwise. Origins that fail to parse as header values are skipped.
fn build_cors_layer(trusted_origins: &[String]) -> CorsLayer {
    if trusted_origins.is_empty() {
        return CorsLayer::new();
    }
    let origins: Vec<axum::http::HeaderValue> = trusted_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Opens the durable store, wires connectors, assembles [`AppState`], spawns
/// the background sweep, and serves the HTTP surface until shutdown.
///
/// # Errors
///
/// Returns [`RunError`] when the store fails to open, a connector entry is
/// malformed, the bind address is invalid, or the listener fails.
pub async fn run(config: ServiceConfig) -> Result<(), RunError> {
    let store_config = SqliteStoreConfig::new(config.data_dir.join("approval-gate.sqlite3"));
    let store = SqliteStore::open(&store_config)?;
    let registry = connectors::build_registry(&config.connectors)?;
    let bind = config.server.bind.clone();
    let state = Arc::new(AppState::new(config, store, registry));

    tokio::spawn(background::run_sweep_loop(Arc::clone(&state)));

    let addr: SocketAddr = bind
        .parse()
        .map_err(|err| RunError::InvalidBindAddress(bind, err))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "approval-gate-http listening");

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves once Ctrl+C or (on Unix) SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[allow(
            clippy::expect_used,
            reason = "Failure to install the Ctrl+C handler is unrecoverable at startup."
        )]
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[allow(
            clippy::expect_used,
            reason = "Failure to install the SIGTERM handler is unrecoverable at startup."
        )]
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
