// crates/approval-gate-authz/src/evaluator.rs
// ============================================================================
// Module: Authorization Evaluator
// Description: Pure evaluation of whether an operator's role, permissions,
// and active delegations authorize an intent.
// Purpose: Decide allow/deny for a submission without any I/O or mutation.
// Dependencies: approval-gate-core
// ============================================================================

//! ## Overview
//! The evaluator is a pure function: given a query snapshot, it returns a
//! structured decision. It never reads the wall clock (`now` is supplied by
//! the caller) and never throws on malformed delegation data; a delegation
//! whose timestamps fail to parse is silently excluded from consideration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use approval_gate_core::ActionIntent;
use approval_gate_core::ConnectorName;
use approval_gate_core::DelegationId;
use approval_gate_core::OperatorId;
use approval_gate_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Required Permission Derivation
// ============================================================================

/// Derives the set of permissions required to authorize `intent`.
///
/// The connectors touched by the submission are not consulted here; they
/// only enter the decision procedure through delegation scope matching
/// (`connector:<name>` scope entries).
#[must_use]
pub fn required_permissions(intent: &ActionIntent) -> BTreeSet<String> {
    let label = intent.as_str();
    let required = match label {
        "deploy_policy" | "open_repository" | "update_config" => "deploy",
        "seal_record" => "seal",
        _ if label.starts_with("notify_") => "notify",
        _ if label.starts_with("archive_") => "archive",
        _ => "deploy",
    };
    BTreeSet::from([required.to_string()])
}

// ============================================================================
// SECTION: Delegation
// ============================================================================

/// A delegation grant as supplied to the evaluator.
///
/// Timestamps are carried as RFC 3339 strings rather than parsed
/// [`Timestamp`] values so that a malformed entry can be silently ignored
/// during evaluation instead of rejecting the whole query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegation identifier.
    pub id: DelegationId,
    /// Operator who granted the delegation, if recorded.
    pub delegator: Option<OperatorId>,
    /// RFC 3339 instant the delegation becomes active.
    pub from: String,
    /// RFC 3339 instant the delegation expires, if bounded.
    pub until: Option<String>,
    /// Scope entries; see [`scope_satisfies`] for matching rules.
    pub scope: Vec<String>,
    /// Tie-break precedence; missing is treated as `0`.
    pub precedence: Option<i64>,
}

/// Returns `true` when `now` falls within `[from, until)`, treating a
/// missing `until` as unbounded. Returns `false` (not an error) when `from`
/// or `until` fails to parse.
#[must_use]
fn delegation_is_active(delegation: &Delegation, now: Timestamp) -> bool {
    let Ok(from) = Timestamp::parse(&delegation.from) else {
        return false;
    };
    if now < from {
        return false;
    }
    match &delegation.until {
        None => true,
        Some(raw) => match Timestamp::parse(raw) {
            Ok(until) => now < until,
            Err(_) => false,
        },
    }
}

/// Returns `true` when any of `delegation`'s scope entries satisfies the
/// query, per the rules in `§4.1`: an entry satisfies if it is `"*"`,
/// equals the intent string, begins with `intent:<intent>`, begins with
/// `permission:<p>` for any required permission `p`, or begins with
/// `connector:<c>` for any touched connector `c`.
#[must_use]
fn scope_satisfies(
    delegation: &Delegation,
    intent: &ActionIntent,
    required: &BTreeSet<String>,
    connectors: &[ConnectorName],
) -> bool {
    delegation.scope.iter().any(|entry| {
        entry == "*"
            || entry == intent.as_str()
            || entry.starts_with(&format!("intent:{}", intent.as_str()))
            || required
                .iter()
                .any(|perm| entry.starts_with(&format!("permission:{perm}")))
            || connectors
                .iter()
                .any(|conn| entry.starts_with(&format!("connector:{}", conn.as_str())))
    })
}

// ============================================================================
// SECTION: Query and Decision
// ============================================================================

/// Input to [`evaluate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationQuery {
    /// Operator requesting authorization.
    pub operator_id: OperatorId,
    /// Operator's static permission set.
    pub permissions: BTreeSet<String>,
    /// Operator's currently recorded delegations.
    pub delegations: Vec<Delegation>,
    /// The intent being authorized.
    pub intent: ActionIntent,
    /// Connectors the plan touches.
    pub connectors: Vec<ConnectorName>,
    /// Evaluation instant.
    pub now: Timestamp,
}

/// Diagnostic detail about how a delegation-sourced decision was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationEvaluation {
    /// `"role"`, `"delegation"`, or `"none"`.
    pub source: String,
    /// `true` when two or more delegations tied on precedence and `from`.
    pub ambiguous: bool,
    /// Ids of every delegation considered active and scope-satisfying.
    pub considered_ids: Vec<DelegationId>,
}

/// The structured result of an authorization query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    /// Permissions required for the query's intent.
    pub required: Vec<String>,
    /// Diagnostic detail about delegation evaluation.
    pub delegation_evaluation: DelegationEvaluation,
    /// Whether the operator is authorized.
    pub allowed: bool,
    /// The winning delegation's id, or empty when authorized by role alone.
    pub delegation_used: String,
    /// `"role"` or `"delegation"`, mirroring `delegation_evaluation.source`.
    pub source: String,
    /// Present only when `allowed` is `false`.
    pub reason: Option<String>,
}

/// Evaluates an authorization query.
///
/// Never panics on malformed delegation data: entries whose `from`/`until`
/// fail to parse are excluded from consideration rather than rejected.
#[must_use]
pub fn evaluate(query: &AuthorizationQuery) -> AuthorizationDecision {
    let required = required_permissions(&query.intent);
    let required_list: Vec<String> = required.iter().cloned().collect();

    if required.is_subset(&query.permissions) {
        return AuthorizationDecision {
            required: required_list,
            delegation_evaluation: DelegationEvaluation {
                source: "role".to_string(),
                ambiguous: false,
                considered_ids: Vec::new(),
            },
            allowed: true,
            delegation_used: String::new(),
            source: "role".to_string(),
            reason: None,
        };
    }

    let satisfying: Vec<&Delegation> = query
        .delegations
        .iter()
        .filter(|delegation| delegation_is_active(delegation, query.now))
        .filter(|delegation| {
            scope_satisfies(delegation, &query.intent, &required, &query.connectors)
        })
        .collect();

    let considered_ids: Vec<DelegationId> = satisfying.iter().map(|d| d.id.clone()).collect();

    let winner = select_winner(&satisfying);

    match winner {
        WinnerOutcome::None => AuthorizationDecision {
            required: required_list,
            delegation_evaluation: DelegationEvaluation {
                source: "none".to_string(),
                ambiguous: false,
                considered_ids,
            },
            allowed: false,
            delegation_used: String::new(),
            source: "none".to_string(),
            reason: Some("insufficient_permissions".to_string()),
        },
        WinnerOutcome::Ambiguous => AuthorizationDecision {
            required: required_list,
            delegation_evaluation: DelegationEvaluation {
                source: "none".to_string(),
                ambiguous: true,
                considered_ids,
            },
            allowed: false,
            delegation_used: String::new(),
            source: "none".to_string(),
            reason: Some("delegation_ambiguity".to_string()),
        },
        WinnerOutcome::Single(delegation) => AuthorizationDecision {
            required: required_list,
            delegation_evaluation: DelegationEvaluation {
                source: "delegation".to_string(),
                ambiguous: false,
                considered_ids,
            },
            allowed: true,
            delegation_used: delegation.id.to_string(),
            source: "delegation".to_string(),
            reason: None,
        },
    }
}

/// The outcome of ranking a set of satisfying delegations.
enum WinnerOutcome<'a> {
    /// No delegation satisfied the query.
    None,
    /// Exactly one delegation ranked highest.
    Single(&'a Delegation),
    /// Two or more delegations tied on both precedence and `from`.
    Ambiguous,
}

/// A satisfying delegation paired with its ranking keys.
struct Ranked<'a> {
    /// The delegation this ranking describes.
    delegation: &'a Delegation,
    /// `precedence`, defaulting missing values to `0`.
    precedence: i64,
    /// Parsed `from` instant.
    from: Timestamp,
}

/// Selects the highest-`precedence`, earliest-`from` delegation among
/// `satisfying`, detecting ties on both criteria as ambiguous.
fn select_winner<'a>(satisfying: &[&'a Delegation]) -> WinnerOutcome<'a> {
    let ranked: Vec<Ranked<'a>> = satisfying
        .iter()
        .filter_map(|delegation| {
            Timestamp::parse(&delegation.from).ok().map(|from| Ranked {
                delegation,
                precedence: delegation.precedence.unwrap_or(0),
                from,
            })
        })
        .collect();

    let Some(best_precedence) = ranked.iter().map(|r| r.precedence).max() else {
        return WinnerOutcome::None;
    };

    let at_best_precedence: Vec<&Ranked<'a>> = ranked
        .iter()
        .filter(|r| r.precedence == best_precedence)
        .collect();

    let Some(earliest_from) = at_best_precedence.iter().map(|r| r.from).min() else {
        return WinnerOutcome::None;
    };

    let tied: Vec<&'a Delegation> = at_best_precedence
        .iter()
        .filter(|r| r.from == earliest_from)
        .map(|r| r.delegation)
        .collect();

    match tied.as_slice() {
        [] => WinnerOutcome::None,
        [single] => WinnerOutcome::Single(single),
        _ => WinnerOutcome::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::AuthorizationQuery;
    use super::Delegation;
    use super::evaluate;
    use super::required_permissions;
    use approval_gate_core::ActionIntent;
    use approval_gate_core::DelegationId;
    use approval_gate_core::OperatorId;
    use approval_gate_core::Timestamp;
    use std::collections::BTreeSet;

    fn now() -> Timestamp {
        Timestamp::parse("2026-06-01T00:00:00Z").expect("parse")
    }

    #[test]
    fn required_permissions_follows_the_derivation_table() {
        assert_eq!(
            required_permissions(&ActionIntent::new("deploy_policy")),
            BTreeSet::from(["deploy".to_string()])
        );
        assert_eq!(
            required_permissions(&ActionIntent::new("seal_record")),
            BTreeSet::from(["seal".to_string()])
        );
        assert_eq!(
            required_permissions(&ActionIntent::new("notify_oncall")),
            BTreeSet::from(["notify".to_string()])
        );
        assert_eq!(
            required_permissions(&ActionIntent::new("archive_bucket")),
            BTreeSet::from(["archive".to_string()])
        );
        assert_eq!(
            required_permissions(&ActionIntent::new("mystery_intent")),
            BTreeSet::from(["deploy".to_string()])
        );
    }

    #[test]
    fn role_superset_allows_regardless_of_delegations() {
        let query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::from(["deploy".to_string(), "seal".to_string()]),
            delegations: Vec::new(),
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let decision = evaluate(&query);
        assert!(decision.allowed);
        assert_eq!(decision.source, "role");
        assert_eq!(decision.delegation_used, "");
    }

    #[test]
    fn adding_delegations_does_not_change_a_role_allowed_result() {
        let mut query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::from(["deploy".to_string()]),
            delegations: Vec::new(),
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let without = evaluate(&query);
        query.delegations.push(Delegation {
            id: DelegationId::new("d-1"),
            delegator: None,
            from: "2020-01-01T00:00:00Z".to_string(),
            until: None,
            scope: vec!["*".to_string()],
            precedence: Some(100),
        });
        let with = evaluate(&query);
        assert_eq!(without.allowed, with.allowed);
        assert_eq!(without.source, with.source);
    }

    #[test]
    fn insufficient_permissions_with_no_delegation_is_denied() {
        let query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::new(),
            delegations: Vec::new(),
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let decision = evaluate(&query);
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("insufficient_permissions"));
    }

    #[test]
    fn a_single_satisfying_delegation_is_used() {
        let query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::new(),
            delegations: vec![Delegation {
                id: DelegationId::new("d-1"),
                delegator: Some(OperatorId::new("admin-1")),
                from: "2026-01-01T00:00:00Z".to_string(),
                until: Some("2026-12-31T00:00:00Z".to_string()),
                scope: vec!["permission:deploy".to_string()],
                precedence: None,
            }],
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let decision = evaluate(&query);
        assert!(decision.allowed);
        assert_eq!(decision.source, "delegation");
        assert_eq!(decision.delegation_used, "d-1");
    }

    #[test]
    fn an_expired_delegation_is_ignored() {
        let query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::new(),
            delegations: vec![Delegation {
                id: DelegationId::new("d-1"),
                delegator: None,
                from: "2020-01-01T00:00:00Z".to_string(),
                until: Some("2021-01-01T00:00:00Z".to_string()),
                scope: vec!["*".to_string()],
                precedence: None,
            }],
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let decision = evaluate(&query);
        assert!(!decision.allowed);
    }

    #[test]
    fn a_malformed_timestamp_is_silently_ignored_not_an_error() {
        let query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::new(),
            delegations: vec![Delegation {
                id: DelegationId::new("d-1"),
                delegator: None,
                from: "not-a-timestamp".to_string(),
                until: None,
                scope: vec!["*".to_string()],
                precedence: None,
            }],
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let decision = evaluate(&query);
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("insufficient_permissions"));
    }

    #[test]
    fn two_equally_ranked_delegations_are_ambiguous() {
        let query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::new(),
            delegations: vec![
                Delegation {
                    id: DelegationId::new("d-1"),
                    delegator: None,
                    from: "2026-01-01T00:00:00Z".to_string(),
                    until: None,
                    scope: vec!["*".to_string()],
                    precedence: Some(5),
                },
                Delegation {
                    id: DelegationId::new("d-2"),
                    delegator: None,
                    from: "2026-01-01T00:00:00Z".to_string(),
                    until: None,
                    scope: vec!["*".to_string()],
                    precedence: Some(5),
                },
            ],
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let decision = evaluate(&query);
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("delegation_ambiguity"));
        assert!(decision.delegation_evaluation.ambiguous);
    }

    #[test]
    fn higher_precedence_wins_over_earlier_from() {
        let query = AuthorizationQuery {
            operator_id: OperatorId::new("op-1"),
            permissions: BTreeSet::new(),
            delegations: vec![
                Delegation {
                    id: DelegationId::new("low"),
                    delegator: None,
                    from: "2020-01-01T00:00:00Z".to_string(),
                    until: None,
                    scope: vec!["*".to_string()],
                    precedence: Some(1),
                },
                Delegation {
                    id: DelegationId::new("high"),
                    delegator: None,
                    from: "2025-01-01T00:00:00Z".to_string(),
                    until: None,
                    scope: vec!["*".to_string()],
                    precedence: Some(10),
                },
            ],
            intent: ActionIntent::new("deploy_policy"),
            connectors: Vec::new(),
            now: now(),
        };
        let decision = evaluate(&query);
        assert_eq!(decision.delegation_used, "high");
    }
}
