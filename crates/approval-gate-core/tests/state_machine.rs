// crates/approval-gate-core/tests/state_machine.rs
// ============================================================================
// Module: Approval Status State Machine Integration Tests
// Description: Exercises the allowed-edge graph end to end and the chain
// template order validation helper against realistic inputs.
// Dependencies: approval-gate-core, proptest
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

use approval_gate_core::ApprovalStatus;
use approval_gate_core::ChainTemplateStep;
use approval_gate_core::TemplateOrderError;
use approval_gate_core::validate_orders;
use proptest::prelude::*;

#[test]
fn full_happy_path_reaches_dispatched() {
    let path = [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Dispatching,
        ApprovalStatus::Dispatched,
    ];
    for pair in path.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]), "{pair:?} should be legal");
    }
    assert!(path.last().expect("non-empty").is_terminal());
}

#[test]
fn rejected_path_never_reaches_dispatch() {
    assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Rejected));
    assert!(!ApprovalStatus::Rejected.can_transition_to(ApprovalStatus::Dispatching));
}

#[test]
fn dispatch_failed_is_reachable_only_through_dispatching() {
    assert!(!ApprovalStatus::Approved.can_transition_to(ApprovalStatus::DispatchFailed));
    assert!(ApprovalStatus::Dispatching.can_transition_to(ApprovalStatus::DispatchFailed));
}

fn step(order: u32) -> ChainTemplateStep {
    ChainTemplateStep {
        order,
        required_role: "reviewer".to_string(),
        label: "review".to_string(),
    }
}

#[test]
fn a_three_order_group_template_with_parallel_steps_validates() {
    let steps = vec![step(0), step(0), step(1), step(2), step(2), step(2)];
    let sorted = validate_orders(steps).expect("valid");
    assert_eq!(sorted.len(), 6);
    assert_eq!(sorted[0].order, 0);
    assert_eq!(sorted.last().expect("non-empty").order, 2);
}

proptest! {
    #[test]
    fn any_permutation_of_a_valid_order_set_is_accepted(
        orders in prop::collection::vec(0u32..6, 1..12)
    ) {
        let max = *orders.iter().max().expect("non-empty");
        let present: std::collections::BTreeSet<u32> = orders.iter().copied().collect();
        let is_contiguous_from_zero = present.len() as u32 == max + 1 && present.contains(&0);

        let steps: Vec<ChainTemplateStep> = orders.into_iter().map(step).collect();
        let result = validate_orders(steps);

        if is_contiguous_from_zero {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err(), TemplateOrderError::NonSequentialOrders);
        }
    }
}
