// crates/approval-gate-metrics/src/registry.rs
// ============================================================================
// Module: Metrics Registry
// Description: In-memory counters, gauges, and histograms with Prometheus
// text-exposition rendering.
// Purpose: Give every request-handling path a single process-wide place to
// record observability data, independent of any specific telemetry backend.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! The registry is a process-wide singleton, created once at startup and
//! torn down at stop. All series are pre-registered through the fixed
//! catalog (see `catalog.rs`); `increment`/`set_gauge`/`observe` operate
//! only on already-registered names so that a typo in a call site surfaces
//! immediately as [`MetricsError::NotRegistered`] rather than silently
//! fabricating a new series.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by registry operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    /// The named series was never registered.
    #[error("metric series not registered: {0}")]
    NotRegistered(String),
    /// The named series was registered with a different kind.
    #[error("metric series {0} is not a {1}")]
    WrongKind(String, &'static str),
}

// ============================================================================
// SECTION: Atomic Float Helpers
// ============================================================================

/// Loads the `f64` currently stored in `slot`.
fn load_f64(slot: &AtomicU64) -> f64 {
    f64::from_bits(slot.load(Ordering::Relaxed))
}

/// Adds `delta` to the `f64` stored in `slot` via compare-and-swap retry.
fn add_f64(slot: &AtomicU64, delta: f64) {
    let mut current = slot.load(Ordering::Relaxed);
    loop {
        let next = f64::from_bits(current) + delta;
        match slot.compare_exchange_weak(
            current,
            next.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

/// Overwrites the `f64` stored in `slot`.
fn store_f64(slot: &AtomicU64, value: f64) {
    slot.store(value.to_bits(), Ordering::Relaxed);
}

// ============================================================================
// SECTION: Histogram State
// ============================================================================

/// Internal mutable state for a histogram series.
///
/// `bucket_counts[i]` holds the number of observations whose value fell in
/// `(boundaries[i-1], boundaries[i]]` (or `(-inf, boundaries[0]]` for `i ==
/// 0`); the final entry is the overflow bucket for values above every
/// finite boundary, i.e. the `+Inf` bucket. Cumulative bucket totals are
/// computed at read time, matching Prometheus's `le`-cumulative convention.
struct HistogramState {
    /// Ascending finite bucket boundaries; `+Inf` is implicit.
    boundaries: Vec<f64>,
    /// Per-bucket observation counts, length `boundaries.len() + 1`.
    bucket_counts: Vec<AtomicU64>,
    /// Total observation count.
    count: AtomicU64,
    /// Sum of all observed values, stored as `f64` bits.
    sum_bits: AtomicU64,
}

impl HistogramState {
    /// Creates a new histogram with the given ascending boundaries.
    fn new(boundaries: Vec<f64>) -> Self {
        let bucket_counts = (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            boundaries,
            bucket_counts,
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0),
        }
    }

    /// Records one observation.
    fn observe(&self, value: f64) {
        let bucket = self
            .boundaries
            .iter()
            .position(|boundary| value <= *boundary)
            .unwrap_or(self.boundaries.len());
        self.bucket_counts[bucket].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        add_f64(&self.sum_bits, value);
    }

    /// Returns cumulative `(le-boundary-label, count)` pairs, ending with
    /// `("+Inf", total_count)`.
    fn cumulative_buckets(&self) -> Vec<(String, u64)> {
        let mut running = 0_u64;
        let mut out = Vec::with_capacity(self.bucket_counts.len());
        for (index, bucket) in self.bucket_counts.iter().enumerate() {
            running += bucket.load(Ordering::Relaxed);
            let label = self
                .boundaries
                .get(index)
                .map_or_else(|| "+Inf".to_string(), |boundary| format!("{boundary}"));
            out.push((label, running));
        }
        out
    }
}

// ============================================================================
// SECTION: Metric Series
// ============================================================================

/// The kind of a registered metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A settable gauge.
    Gauge,
    /// A histogram with fixed bucket boundaries.
    Histogram,
}

impl MetricKind {
    /// Returns the Prometheus `# TYPE` token for this kind.
    #[must_use]
    pub const fn prometheus_type(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

/// A registered series's storage.
enum Series {
    /// Counter storage: `f64` bits, only ever increased.
    Counter(AtomicU64),
    /// Gauge storage: `f64` bits, freely settable.
    Gauge(AtomicU64),
    /// Histogram storage.
    Histogram(HistogramState),
}

impl Series {
    /// Returns this series's [`MetricKind`].
    const fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// A single rendered sample, as returned by [`MetricsRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Fully qualified sample name, e.g. `approval_time_seconds_bucket{le="1"}`.
    pub name: String,
    /// The series kind this sample was rendered from.
    pub kind: MetricKind,
    /// The sample's numeric value.
    pub value: f64,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// In-memory, process-wide metrics registry.
///
/// Read access (`snapshot`, `prometheus`) takes a read lock over the series
/// map; mutation of an individual series is lock-free via atomics, matching
/// the concurrency posture of a read-mostly, write-often workload.
pub struct MetricsRegistry {
    /// Name -> series storage. The map itself is mutated only at
    /// registration time (process start or test setup); per-series values
    /// mutate through atomics without touching the map. The write lock
    /// itself serializes concurrent `register_*` calls, so no separate
    /// registration mutex is needed.
    series: RwLock<BTreeMap<String, Series>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Unwraps a lock result, recovering a poisoned lock's guard instead of
/// propagating the panic that poisoned it. Metrics are best-effort
/// observability data; a prior panicked reader must not take the whole
/// registry down with it.
fn recover<T>(result: Result<T, std::sync::PoisonError<T>>) -> T {
    result.unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MetricsRegistry {
    /// Creates an empty registry with no registered series.
    #[must_use]
    pub fn new() -> Self {
        Self {
            series: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a counter series, initialized to zero.
    pub fn register_counter(&self, name: impl Into<String>) {
        recover(self.series.write()).insert(name.into(), Series::Counter(AtomicU64::new(0)));
    }

    /// Registers a gauge series, initialized to zero.
    pub fn register_gauge(&self, name: impl Into<String>) {
        recover(self.series.write()).insert(name.into(), Series::Gauge(AtomicU64::new(0)));
    }

    /// Registers a histogram series with the given ascending bucket
    /// boundaries (the `+Inf` bucket is implicit and must not be included).
    pub fn register_histogram(&self, name: impl Into<String>, boundaries: Vec<f64>) {
        recover(self.series.write()).insert(
            name.into(),
            Series::Histogram(HistogramState::new(boundaries)),
        );
    }

    /// Increments a counter by `delta` (default `1.0` at call sites that
    /// pass `1.0` explicitly; there is no implicit default in this API).
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::NotRegistered`] when `name` was never
    /// registered, or [`MetricsError::WrongKind`] when it is not a counter.
    pub fn increment(&self, name: &str, delta: f64) -> Result<(), MetricsError> {
        let guard = recover(self.series.read());
        match guard.get(name) {
            Some(Series::Counter(slot)) => {
                add_f64(slot, delta);
                Ok(())
            }
            Some(_) => Err(MetricsError::WrongKind(name.to_string(), "counter")),
            None => Err(MetricsError::NotRegistered(name.to_string())),
        }
    }

    /// Sets a gauge to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::NotRegistered`] when `name` was never
    /// registered, or [`MetricsError::WrongKind`] when it is not a gauge.
    pub fn set_gauge(&self, name: &str, value: f64) -> Result<(), MetricsError> {
        let guard = recover(self.series.read());
        match guard.get(name) {
            Some(Series::Gauge(slot)) => {
                store_f64(slot, value);
                Ok(())
            }
            Some(_) => Err(MetricsError::WrongKind(name.to_string(), "gauge")),
            None => Err(MetricsError::NotRegistered(name.to_string())),
        }
    }

    /// Records one histogram observation.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::NotRegistered`] when `name` was never
    /// registered, or [`MetricsError::WrongKind`] when it is not a
    /// histogram.
    pub fn observe(&self, name: &str, value: f64) -> Result<(), MetricsError> {
        let guard = recover(self.series.read());
        match guard.get(name) {
            Some(Series::Histogram(state)) => {
                state.observe(value);
                Ok(())
            }
            Some(_) => Err(MetricsError::WrongKind(name.to_string(), "histogram")),
            None => Err(MetricsError::NotRegistered(name.to_string())),
        }
    }

    /// Returns a flat, deterministically ordered snapshot of every sample
    /// across every registered series.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MetricSample> {
        let guard = recover(self.series.read());
        let mut out = Vec::new();
        for (name, series) in guard.iter() {
            match series {
                Series::Counter(slot) => out.push(MetricSample {
                    name: name.clone(),
                    kind: MetricKind::Counter,
                    value: load_f64(slot),
                }),
                Series::Gauge(slot) => out.push(MetricSample {
                    name: name.clone(),
                    kind: MetricKind::Gauge,
                    value: load_f64(slot),
                }),
                Series::Histogram(state) => {
                    out.push(MetricSample {
                        name: format!("{name}_count"),
                        kind: MetricKind::Histogram,
                        value: state.count.load(Ordering::Relaxed) as f64,
                    });
                    out.push(MetricSample {
                        name: format!("{name}_sum"),
                        kind: MetricKind::Histogram,
                        value: load_f64(&state.sum_bits),
                    });
                    for (label, count) in state.cumulative_buckets() {
                        out.push(MetricSample {
                            name: format!("{name}_bucket{{le=\"{label}\"}}"),
                            kind: MetricKind::Histogram,
                            value: count as f64,
                        });
                    }
                }
            }
        }
        out
    }

    /// Renders the registry as Prometheus text exposition format, looking
    /// up each series's `# HELP` text in `help_table` (a missing entry
    /// simply omits the `HELP` line for that series).
    #[must_use]
    pub fn prometheus(&self, help_table: &BTreeMap<String, String>) -> String {
        let guard = recover(self.series.read());
        let mut out = String::new();
        for (name, series) in guard.iter() {
            if let Some(help) = help_table.get(name) {
                out.push_str(&format!("# HELP {name} {help}\n"));
            }
            out.push_str(&format!("# TYPE {name} {}\n", series.kind().prometheus_type()));
            match series {
                Series::Counter(slot) => {
                    out.push_str(&format!("{name} {}\n", load_f64(slot)));
                }
                Series::Gauge(slot) => {
                    out.push_str(&format!("{name} {}\n", load_f64(slot)));
                }
                Series::Histogram(state) => {
                    for (label, count) in state.cumulative_buckets() {
                        out.push_str(&format!("{name}_bucket{{le=\"{label}\"}} {count}\n"));
                    }
                    out.push_str(&format!(
                        "{name}_sum {}\n",
                        load_f64(&state.sum_bits)
                    ));
                    out.push_str(&format!(
                        "{name}_count {}\n",
                        state.count.load(Ordering::Relaxed)
                    ));
                }
            }
        }
        out
    }

    /// Resets every registered series back to zero, preserving the set of
    /// registered names and histogram boundaries. Intended for test
    /// isolation between scenarios sharing one process.
    pub fn reset(&self) {
        let guard = recover(self.series.read());
        for series in guard.values() {
            match series {
                Series::Counter(slot) | Series::Gauge(slot) => {
                    slot.store(0, Ordering::Relaxed);
                }
                Series::Histogram(state) => {
                    state.count.store(0, Ordering::Relaxed);
                    state.sum_bits.store(0, Ordering::Relaxed);
                    for bucket in &state.bucket_counts {
                        bucket.store(0, Ordering::Relaxed);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::MetricsError;
    use super::MetricsRegistry;

    #[test]
    fn counter_increments_and_is_monotonic() {
        let registry = MetricsRegistry::new();
        registry.register_counter("approvals_created_total");
        registry.increment("approvals_created_total", 1.0).unwrap();
        registry.increment("approvals_created_total", 1.0).unwrap();
        let sample = registry
            .snapshot()
            .into_iter()
            .find(|s| s.name == "approvals_created_total")
            .unwrap();
        assert_eq!(sample.value, 2.0);
    }

    #[test]
    fn gauge_is_overwritten_not_accumulated() {
        let registry = MetricsRegistry::new();
        registry.register_gauge("approval_pending_gauge");
        registry.set_gauge("approval_pending_gauge", 5.0).unwrap();
        registry.set_gauge("approval_pending_gauge", 3.0).unwrap();
        let sample = registry
            .snapshot()
            .into_iter()
            .find(|s| s.name == "approval_pending_gauge")
            .unwrap();
        assert_eq!(sample.value, 3.0);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let registry = MetricsRegistry::new();
        registry.register_histogram("approval_time_seconds", vec![1.0, 5.0, 10.0]);
        registry.observe("approval_time_seconds", 0.5).unwrap();
        registry.observe("approval_time_seconds", 3.0).unwrap();
        registry.observe("approval_time_seconds", 20.0).unwrap();

        let rendered = registry.prometheus(&std::collections::BTreeMap::new());
        assert!(rendered.contains("approval_time_seconds_bucket{le=\"1\"} 1"));
        assert!(rendered.contains("approval_time_seconds_bucket{le=\"5\"} 2"));
        assert!(rendered.contains("approval_time_seconds_bucket{le=\"10\"} 2"));
        assert!(rendered.contains("approval_time_seconds_bucket{le=\"+Inf\"} 3"));
        assert!(rendered.contains("approval_time_seconds_count 3"));
    }

    #[test]
    fn unregistered_series_is_an_error() {
        let registry = MetricsRegistry::new();
        let err = registry.increment("nonexistent", 1.0).unwrap_err();
        assert_eq!(err, MetricsError::NotRegistered("nonexistent".to_string()));
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let registry = MetricsRegistry::new();
        registry.register_counter("approvals_created_total");
        let err = registry.set_gauge("approvals_created_total", 1.0).unwrap_err();
        assert_eq!(
            err,
            MetricsError::WrongKind("approvals_created_total".to_string(), "gauge")
        );
    }

    #[test]
    fn reset_zeroes_every_series_without_unregistering() {
        let registry = MetricsRegistry::new();
        registry.register_counter("c");
        registry.register_histogram("h", vec![1.0]);
        registry.increment("c", 4.0).unwrap();
        registry.observe("h", 0.5).unwrap();
        registry.reset();
        assert!(registry.increment("c", 0.0).is_ok());
        let sample = registry.snapshot().into_iter().find(|s| s.name == "c").unwrap();
        assert_eq!(sample.value, 0.0);
    }
}
