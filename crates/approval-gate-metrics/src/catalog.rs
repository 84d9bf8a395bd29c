// crates/approval-gate-metrics/src/catalog.rs
// ============================================================================
// Module: Fixed Metric Catalog
// Description: Names, kinds, help text, and histogram boundaries for every
// series the approval gate records.
// Purpose: Seed a `MetricsRegistry` once at startup so every call site
// references a name that is already registered.
// Dependencies: crate::registry
// ============================================================================

use crate::registry::MetricsRegistry;
use std::collections::BTreeMap;

// ============================================================================
// SECTION: Series Names
// ============================================================================

/// Count of approvals created via `/pj/execute`.
pub const APPROVALS_CREATED_TOTAL: &str = "approvals_created_total";
/// Count of approvals that reached `approved`.
pub const APPROVALS_APPROVED_TOTAL: &str = "approvals_approved_total";
/// Count of approvals that reached `rejected`.
pub const APPROVALS_REJECTED_TOTAL: &str = "approvals_rejected_total";
/// Count of dispatch attempts that completed successfully.
pub const APPROVAL_DISPATCH_SUCCESS_TOTAL: &str = "approval_dispatch_success_total";
/// Count of dispatch attempts whose handler ultimately failed.
pub const APPROVAL_DISPATCH_FAILURE_TOTAL: &str = "approval_dispatch_failure_total";
/// Count of `consume_for_dispatch` calls that won the race.
pub const APPROVAL_CONSUME_CAS_SUCCESS_TOTAL: &str = "approval_consume_cas_success_total";
/// Count of `consume_for_dispatch` calls that lost the race.
pub const APPROVAL_CONSUME_CAS_CONFLICT_TOTAL: &str = "approval_consume_cas_conflict_total";
/// Current count of approvals in `pending`.
pub const APPROVAL_PENDING_GAUGE: &str = "approval_pending_gauge";
/// Distribution of time spent in `pending` before a decision, in seconds.
pub const APPROVAL_TIME_SECONDS: &str = "approval_time_seconds";
/// Distribution of dispatch handler latency, in seconds.
pub const APPROVAL_DISPATCH_LATENCY_SECONDS: &str = "approval_dispatch_latency_seconds";
/// Count of chain steps activated across all chain instances.
pub const APPROVAL_CHAIN_STEPS_TOTAL: &str = "approval_chain_steps_total";
/// Count of chain steps that received a decision.
pub const APPROVAL_CHAIN_STEP_DECIDED_TOTAL: &str = "approval_chain_step_decided_total";
/// Count of chain instances that reached `all_approved`.
pub const APPROVAL_CHAIN_COMPLETED_TOTAL: &str = "approval_chain_completed_total";
/// Count of chain instances that reached `rejected`.
pub const APPROVAL_CHAIN_REJECTED_TOTAL: &str = "approval_chain_rejected_total";
/// Current count of chain steps in `active`.
pub const APPROVAL_CHAIN_STEP_PENDING_GAUGE: &str = "approval_chain_step_pending_gauge";
/// Distribution of time a chain step spends `active` before a decision.
pub const APPROVAL_CHAIN_STEP_TIME_SECONDS: &str = "approval_chain_step_time_seconds";

// ============================================================================
// SECTION: Histogram Boundaries
// ============================================================================

/// Latency bucket boundaries in seconds, derived from the teacher's
/// `PERF_BUCKETS_MS` (`[1, 2, 5, 10, 20, 50, 100, 250, 500, 1_000]`
/// milliseconds) scaled down by 1000 since this domain's histograms are
/// seconds-denominated rather than milliseconds-denominated.
#[must_use]
pub fn default_latency_buckets_seconds() -> Vec<f64> {
    [1, 2, 5, 10, 20, 50, 100, 250, 500, 1_000]
        .into_iter()
        .map(|ms: u64| ms as f64 / 1000.0)
        .collect()
}

/// Bucket boundaries for approval/step pending duration, in seconds, wide
/// enough to span a review taking minutes to days.
#[must_use]
pub fn default_pending_duration_buckets_seconds() -> Vec<f64> {
    vec![
        10.0, 30.0, 60.0, 300.0, 900.0, 3_600.0, 14_400.0, 86_400.0, 604_800.0,
    ]
}

// ============================================================================
// SECTION: Catalog Seeding
// ============================================================================

/// Registers every fixed series from §4.6 of the metric catalog against
/// `registry`. Intended to be called exactly once at process startup (or
/// once per test fixture).
pub fn seed(registry: &MetricsRegistry) {
    registry.register_counter(APPROVALS_CREATED_TOTAL);
    registry.register_counter(APPROVALS_APPROVED_TOTAL);
    registry.register_counter(APPROVALS_REJECTED_TOTAL);
    registry.register_counter(APPROVAL_DISPATCH_SUCCESS_TOTAL);
    registry.register_counter(APPROVAL_DISPATCH_FAILURE_TOTAL);
    registry.register_counter(APPROVAL_CONSUME_CAS_SUCCESS_TOTAL);
    registry.register_counter(APPROVAL_CONSUME_CAS_CONFLICT_TOTAL);
    registry.register_gauge(APPROVAL_PENDING_GAUGE);
    registry.register_histogram(
        APPROVAL_TIME_SECONDS,
        default_pending_duration_buckets_seconds(),
    );
    registry.register_histogram(
        APPROVAL_DISPATCH_LATENCY_SECONDS,
        default_latency_buckets_seconds(),
    );
    registry.register_counter(APPROVAL_CHAIN_STEPS_TOTAL);
    registry.register_counter(APPROVAL_CHAIN_STEP_DECIDED_TOTAL);
    registry.register_counter(APPROVAL_CHAIN_COMPLETED_TOTAL);
    registry.register_counter(APPROVAL_CHAIN_REJECTED_TOTAL);
    registry.register_gauge(APPROVAL_CHAIN_STEP_PENDING_GAUGE);
    registry.register_histogram(
        APPROVAL_CHAIN_STEP_TIME_SECONDS,
        default_pending_duration_buckets_seconds(),
    );
}

/// Returns the `# HELP` text for every series in the fixed catalog, keyed
/// by series name, for use with [`MetricsRegistry::prometheus`].
#[must_use]
pub fn help_table() -> BTreeMap<String, String> {
    let entries: &[(&str, &str)] = &[
        (APPROVALS_CREATED_TOTAL, "Total approvals created."),
        (APPROVALS_APPROVED_TOTAL, "Total approvals approved."),
        (APPROVALS_REJECTED_TOTAL, "Total approvals rejected."),
        (
            APPROVAL_DISPATCH_SUCCESS_TOTAL,
            "Total dispatch attempts that succeeded.",
        ),
        (
            APPROVAL_DISPATCH_FAILURE_TOTAL,
            "Total dispatch attempts whose handler failed.",
        ),
        (
            APPROVAL_CONSUME_CAS_SUCCESS_TOTAL,
            "Total consume_for_dispatch calls that won the race.",
        ),
        (
            APPROVAL_CONSUME_CAS_CONFLICT_TOTAL,
            "Total consume_for_dispatch calls that lost the race.",
        ),
        (
            APPROVAL_PENDING_GAUGE,
            "Current number of approvals pending decision.",
        ),
        (
            APPROVAL_TIME_SECONDS,
            "Time an approval spent pending before a decision, in seconds.",
        ),
        (
            APPROVAL_DISPATCH_LATENCY_SECONDS,
            "Dispatch handler latency, in seconds.",
        ),
        (
            APPROVAL_CHAIN_STEPS_TOTAL,
            "Total chain steps activated.",
        ),
        (
            APPROVAL_CHAIN_STEP_DECIDED_TOTAL,
            "Total chain steps that received a decision.",
        ),
        (
            APPROVAL_CHAIN_COMPLETED_TOTAL,
            "Total chain instances that reached all_approved.",
        ),
        (
            APPROVAL_CHAIN_REJECTED_TOTAL,
            "Total chain instances that reached rejected.",
        ),
        (
            APPROVAL_CHAIN_STEP_PENDING_GAUGE,
            "Current number of chain steps active.",
        ),
        (
            APPROVAL_CHAIN_STEP_TIME_SECONDS,
            "Time a chain step spent active before a decision, in seconds.",
        ),
    ];
    entries
        .iter()
        .map(|(name, help)| ((*name).to_string(), (*help).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::*;

    #[test]
    fn seeding_registers_every_catalog_series() {
        let registry = MetricsRegistry::new();
        seed(&registry);
        registry.increment(APPROVALS_CREATED_TOTAL, 1.0).unwrap();
        registry.set_gauge(APPROVAL_PENDING_GAUGE, 1.0).unwrap();
        registry.observe(APPROVAL_TIME_SECONDS, 1.0).unwrap();
        registry
            .observe(APPROVAL_CHAIN_STEP_TIME_SECONDS, 1.0)
            .unwrap();
    }

    #[test]
    fn help_table_covers_every_registered_series() {
        let help = help_table();
        assert_eq!(help.len(), 16);
        assert!(help.contains_key(APPROVALS_CREATED_TOTAL));
        assert!(help.contains_key(APPROVAL_CHAIN_STEP_TIME_SECONDS));
    }
}
