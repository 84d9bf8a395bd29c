// crates/approval-gate-core/src/chain.rs
// ============================================================================
// Module: Chain Templates and Step Instances
// Description: Multi-step/parallel review chain data model and order-group
// advancement rules shared by every chain store backend.
// Purpose: Give the HTTP surface and the store a single definition of a
// chain template and the step instances materialized from it.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A chain template defines an ordered sequence of review steps; steps
//! sharing the same `order` form a parallel order-group that must all
//! terminate before the next group activates. This module defines the
//! shapes and the pure ordering invariant; the store owns persistence and
//! the actual CAS-guarded `decide_step` transition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ApprovalId;
use crate::identifiers::StepId;
use crate::identifiers::TemplateId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Chain Template
// ============================================================================

/// One step of a chain template, not yet bound to a specific approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTemplateStep {
    /// Position within the chain; steps sharing an order form a parallel
    /// order-group.
    pub order: u32,
    /// Role required to decide this step.
    pub required_role: String,
    /// Human-readable label.
    pub label: String,
}

/// A named, reusable definition of a review chain.
///
/// # Invariants
/// - The multiset of `steps[i].order` values forms the contiguous range
///   `{0, 1, ..., K-1}` for some `K >= 1`; see [`validate_orders`].
/// - The default template (identified by
///   [`crate::identifiers::DEFAULT_TEMPLATE_ID`]) always exists and can be
///   neither updated nor deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTemplate {
    /// Template identifier.
    pub id: TemplateId,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Steps, sorted ascending by `order`.
    pub steps: Vec<ChainTemplateStep>,
}

/// Error returned when a proposed set of template steps has a malformed
/// order sequence.
///
/// # Invariants
/// - Raised only by [`validate_orders`]; never by store I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TemplateOrderError {
    /// No steps were supplied.
    #[error("a chain template must have at least one step")]
    Empty,
    /// The orders present do not form a contiguous `{0,...,K-1}` range.
    #[error("chain template step orders must form a contiguous range starting at 0")]
    NonSequentialOrders,
}

/// Validates that `steps` carries a contiguous `{0,...,K-1}` multiset of
/// `order` values (duplicates within the range are permitted and denote
/// parallel steps) and returns the steps re-sorted by `order`.
///
/// # Errors
///
/// Returns [`TemplateOrderError`] when `steps` is empty or the orders
/// present skip a value in the contiguous range.
pub fn validate_orders(
    mut steps: Vec<ChainTemplateStep>,
) -> Result<Vec<ChainTemplateStep>, TemplateOrderError> {
    if steps.is_empty() {
        return Err(TemplateOrderError::Empty);
    }
    let distinct: BTreeSet<u32> = steps.iter().map(|step| step.order).collect();
    let expected_count = distinct
        .iter()
        .max()
        .copied()
        .map_or(0, |max| max.saturating_add(1));
    if distinct.len() as u32 != expected_count || !distinct.contains(&0) {
        return Err(TemplateOrderError::NonSequentialOrders);
    }
    steps.sort_by_key(|step| step.order);
    Ok(steps)
}

// ============================================================================
// SECTION: Chain Step Instance
// ============================================================================

/// Status of a materialized chain step instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStepStatus {
    /// Not yet reachable; an earlier order-group has not terminated.
    Pending,
    /// Currently decidable.
    Active,
    /// Decided favorably.
    Approved,
    /// Decided unfavorably.
    Rejected,
    /// Never decided because a sibling or predecessor was rejected.
    Skipped,
}

impl ChainStepStatus {
    /// Returns `true` if this status cannot be decided further.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Skipped)
    }
}

/// One materialized step of a chain, bound to a specific approval.
///
/// # Invariants
/// - `decided_at` is `Some` if and only if `status` is `Approved` or
///   `Rejected` (never for `Skipped`, which is a side effect of a sibling's
///   decision rather than its own).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStepInstance {
    /// Step instance identifier.
    pub id: StepId,
    /// Approval this step belongs to.
    pub approval_id: ApprovalId,
    /// Template the step was materialized from.
    pub template_id: TemplateId,
    /// Order-group this step belongs to.
    pub step_order: u32,
    /// Role required to decide this step.
    pub required_role: String,
    /// Human-readable label.
    pub label: String,
    /// Current status.
    pub status: ChainStepStatus,
    /// Operator who decided this step, once decided.
    pub decider_id: Option<crate::identifiers::OperatorId>,
    /// Free-text note attached by the decider.
    pub decider_note: Option<String>,
    /// Instant the step was decided.
    pub decided_at: Option<Timestamp>,
    /// Instant the step instance was created.
    pub created_at: Timestamp,
}

/// Snapshot of a chain's overall progress, returned by
/// `ChainStore::get_chain_progress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainProgress {
    /// Total number of steps in the chain.
    pub total: usize,
    /// Number of steps that have reached a terminal status.
    pub completed: usize,
    /// The smallest order-group that is not yet fully terminal, if any.
    pub current_step: Option<u32>,
    /// All step instances in the current order-group.
    pub current_steps: Vec<ChainStepInstance>,
    /// `true` once every step is `Approved` (or `Skipped` as a consequence
    /// of one terminal group, which would instead set `rejected`).
    pub all_approved: bool,
    /// `true` once any step has been `Rejected`.
    pub rejected: bool,
    /// Display name of the template this chain was instantiated from.
    pub template_name: String,
}

/// Outcome of deciding a single chain step, returned by
/// `ChainStore::decide_step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDecisionOutcome {
    /// The step instance as it stands after the decision.
    pub step: ChainStepInstance,
    /// `true` when deciding this step activated the next order-group.
    pub advanced: bool,
    /// `true` when this decision brought the entire chain to all-approved.
    pub all_approved: bool,
    /// `true` when this decision rejected the chain.
    pub rejected: bool,
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::ChainTemplateStep;
    use super::TemplateOrderError;
    use super::validate_orders;

    fn step(order: u32, role: &str) -> ChainTemplateStep {
        ChainTemplateStep {
            order,
            required_role: role.to_string(),
            label: role.to_string(),
        }
    }

    #[test]
    fn accepts_a_contiguous_sequential_chain() {
        let steps = vec![step(0, "it"), step(1, "legal"), step(2, "admin")];
        let sorted = validate_orders(steps).expect("valid orders");
        assert_eq!(sorted.len(), 3);
    }

    #[test]
    fn accepts_duplicate_orders_as_a_parallel_group() {
        let steps = vec![step(0, "it"), step(0, "legal"), step(1, "admin")];
        let sorted = validate_orders(steps).expect("valid orders");
        assert_eq!(sorted.iter().filter(|s| s.order == 0).count(), 2);
    }

    #[test]
    fn rejects_a_gap_in_the_order_sequence() {
        let steps = vec![step(0, "it"), step(2, "admin")];
        let err = validate_orders(steps).unwrap_err();
        assert_eq!(err, TemplateOrderError::NonSequentialOrders);
    }

    #[test]
    fn rejects_an_empty_template() {
        let err = validate_orders(Vec::new()).unwrap_err();
        assert_eq!(err, TemplateOrderError::Empty);
    }

    #[test]
    fn rejects_orders_that_do_not_start_at_zero() {
        let steps = vec![step(1, "it"), step(2, "admin")];
        let err = validate_orders(steps).unwrap_err();
        assert_eq!(err, TemplateOrderError::NonSequentialOrders);
    }
}
