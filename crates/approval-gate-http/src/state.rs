// crates/approval-gate-http/src/state.rs
// ============================================================================
// Module: Application State
// Description: The shared handles every handler reaches through `State`.
// Purpose: One process-wide bundle of the durable store, dispatcher
// registry, metrics registry, verifier, and config, built once at startup.
// Dependencies: approval_gate_store_sqlite, approval_gate_dispatch,
// approval_gate_metrics, approval_gate_config
// ============================================================================

use approval_gate_config::ServiceConfig;
use approval_gate_dispatch::DispatcherRegistry;
use approval_gate_metrics::MetricsRegistry;
use approval_gate_metrics::catalog;
use approval_gate_store_sqlite::SqliteStore;

use crate::auth::JwtVerifier;
use crate::auth::Verifier;

/// Everything a handler needs, reached through `State<Arc<AppState>>`.
pub struct AppState {
    /// The durable handle implementing `ApprovalStore`, `ChainStore`, and
    /// `IdempotencyStore`.
    pub store: SqliteStore,
    /// Connector routing table, read-mostly after startup.
    pub registry: DispatcherRegistry,
    /// Process-wide counters, gauges, and histograms.
    pub metrics: MetricsRegistry,
    /// Bearer-token verifier; boxed so a deployment can swap in any
    /// `Verifier` implementation without changing this struct.
    pub verifier: Box<dyn Verifier>,
    /// The validated service configuration this process started with.
    pub config: ServiceConfig,
}

impl AppState {
    /// Assembles application state from a validated config and an already
    /// wired connector registry.
    #[must_use]
    pub fn new(config: ServiceConfig, store: SqliteStore, registry: DispatcherRegistry) -> Self {
        let metrics = MetricsRegistry::new();
        catalog::seed(&metrics);
        let verifier = Box::new(JwtVerifier::new(&config.jwt));
        Self {
            store,
            registry,
            metrics,
            verifier,
            config,
        }
    }
}
