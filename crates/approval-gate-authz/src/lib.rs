// crates/approval-gate-authz/src/lib.rs
// ============================================================================
// Module: Approval Gate Authorization
// Description: Pure authorization evaluation for governed submissions.
// Purpose: Decide whether an operator may perform an intent, independent of
// any store or transport.
// Dependencies: approval-gate-core, serde
// ============================================================================

//! # Approval Gate Authorization
//!
//! This crate has no I/O. [`evaluate`] is a pure function from an
//! [`AuthorizationQuery`] snapshot to an [`AuthorizationDecision`]; callers
//! own fetching the operator's role, permissions, and delegation list, and
//! own supplying the evaluation instant.

mod evaluator;

pub use evaluator::AuthorizationDecision;
pub use evaluator::AuthorizationQuery;
pub use evaluator::Delegation;
pub use evaluator::DelegationEvaluation;
pub use evaluator::evaluate;
pub use evaluator::required_permissions;
