// crates/approval-gate-metrics/tests/catalog_exposition.rs
// ============================================================================
// Module: Catalog Exposition Tests
// Description: End-to-end check that a seeded registry renders valid
// Prometheus text exposition for every catalog series.
// Dependencies: approval-gate-metrics
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use approval_gate_metrics::MetricsRegistry;
use approval_gate_metrics::catalog;

#[test]
fn seeded_registry_renders_every_series_with_help_and_type() {
    let registry = MetricsRegistry::new();
    catalog::seed(&registry);
    registry
        .increment(catalog::APPROVALS_CREATED_TOTAL, 1.0)
        .unwrap();
    registry
        .increment(catalog::APPROVAL_DISPATCH_SUCCESS_TOTAL, 1.0)
        .unwrap();
    registry
        .set_gauge(catalog::APPROVAL_PENDING_GAUGE, 4.0)
        .unwrap();
    registry
        .observe(catalog::APPROVAL_DISPATCH_LATENCY_SECONDS, 0.075)
        .unwrap();

    let rendered = registry.prometheus(&catalog::help_table());

    assert!(rendered.contains("# HELP approvals_created_total"));
    assert!(rendered.contains("# TYPE approvals_created_total counter"));
    assert!(rendered.contains("# TYPE approval_pending_gauge gauge"));
    assert!(rendered.contains("# TYPE approval_dispatch_latency_seconds histogram"));
    assert!(rendered.contains("approval_dispatch_latency_seconds_bucket{le=\"+Inf\"}"));
    assert!(rendered.contains("approval_dispatch_latency_seconds_sum"));
    assert!(rendered.contains("approval_dispatch_latency_seconds_count 1"));
}

#[test]
fn snapshot_is_flat_and_covers_counters_gauges_and_histograms() {
    let registry = MetricsRegistry::new();
    catalog::seed(&registry);
    let names: Vec<String> = registry.snapshot().into_iter().map(|s| s.name).collect();

    assert!(names.contains(&catalog::APPROVALS_APPROVED_TOTAL.to_string()));
    assert!(names.contains(&catalog::APPROVAL_CHAIN_STEP_PENDING_GAUGE.to_string()));
    assert!(names.contains(&format!("{}_count", catalog::APPROVAL_TIME_SECONDS)));
    assert!(names.contains(&format!("{}_sum", catalog::APPROVAL_TIME_SECONDS)));
}
