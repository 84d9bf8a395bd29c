// crates/approval-gate-authz/tests/properties.rs
// ============================================================================
// Module: Authorization Evaluator Property Tests
// Description: Checks the "role gate round-trip" and parallel-independent
// laws from the testable-properties catalog.
// Dependencies: approval-gate-authz, approval-gate-core, proptest
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

use approval_gate_authz::AuthorizationQuery;
use approval_gate_authz::Delegation;
use approval_gate_authz::evaluate;
use approval_gate_core::ActionIntent;
use approval_gate_core::DelegationId;
use approval_gate_core::OperatorId;
use approval_gate_core::Timestamp;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn fixed_now() -> Timestamp {
    Timestamp::parse("2026-06-01T00:00:00Z").expect("parse")
}

proptest! {
    #[test]
    fn role_superset_is_always_allowed_regardless_of_delegations(
        precedence in prop::option::of(-10i64..10),
        scope_is_wildcard in any::<bool>(),
    ) {
        let intent = ActionIntent::new("deploy_policy");
        let mut query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::from(["deploy".to_string()]),
            delegations: Vec::new(),
            intent: intent.clone(),
            connectors: Vec::new(),
            now: fixed_now(),
        };
        let baseline = evaluate(&query);
        prop_assert!(baseline.allowed);
        prop_assert_eq!(&baseline.source, "role");

        query.delegations.push(Delegation {
            id: DelegationId::new("extra"),
            delegator: None,
            from: "2020-01-01T00:00:00Z".to_string(),
            until: None,
            scope: vec![if scope_is_wildcard { "*".to_string() } else { "permission:deploy".to_string() }],
            precedence,
        });
        let with_delegation = evaluate(&query);
        prop_assert_eq!(with_delegation.allowed, baseline.allowed);
        prop_assert_eq!(with_delegation.source, baseline.source);
        prop_assert_eq!(with_delegation.delegation_used, baseline.delegation_used);
    }

    #[test]
    fn precedence_ordering_is_independent_of_list_order(
        first_precedence in 0i64..20,
        second_precedence in 0i64..20,
    ) {
        prop_assume!(first_precedence != second_precedence);

        let make_delegations = |swap: bool| {
            let mut d = vec![
                Delegation {
                    id: DelegationId::new("a"),
                    delegator: None,
                    from: "2020-01-01T00:00:00Z".to_string(),
                    until: None,
                    scope: vec!["*".to_string()],
                    precedence: Some(first_precedence),
                },
                Delegation {
                    id: DelegationId::new("b"),
                    delegator: None,
                    from: "2020-01-01T00:00:00Z".to_string(),
                    until: None,
                    scope: vec!["*".to_string()],
                    precedence: Some(second_precedence),
                },
            ];
            if swap {
                d.reverse();
            }
            d
        };

        let query_forward = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::new(),
            delegations: make_delegations(false),
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: fixed_now(),
        };
        let query_reversed = AuthorizationQuery {
            delegations: make_delegations(true),
            ..query_forward.clone()
        };

        let forward = evaluate(&query_forward);
        let reversed = evaluate(&query_reversed);
        prop_assert_eq!(forward.delegation_used, reversed.delegation_used);
    }
}
