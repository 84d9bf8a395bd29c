// crates/approval-gate-metrics/src/lib.rs
// ============================================================================
// Module: Approval Gate Metrics
// Description: In-memory metrics registry and the fixed series catalog.
// Purpose: Give request-handling code one place to record counters, gauges,
// and histograms, and expose them in Prometheus text-exposition format.
// Dependencies: thiserror
// ============================================================================

//! # Approval Gate Metrics
//!
//! [`MetricsRegistry`] is a process-wide singleton seeded once via
//! [`catalog::seed`] with every series named in the catalog. Call sites
//! reference series by the `catalog` module's name constants rather than
//! string literals, so a rename is a compile error everywhere it matters.

pub mod catalog;
mod registry;

pub use registry::MetricKind;
pub use registry::MetricSample;
pub use registry::MetricsError;
pub use registry::MetricsRegistry;
