// crates/approval-gate-core/src/approval.rs
// ============================================================================
// Module: Approval Record and State Machine
// Description: The approval record, its plan steps, and the status state
// machine governing the lifecycle from submission to dispatch.
// Purpose: Give every store backend (in-memory, SQLite, ...) a single shared
// definition of what an approval is and which transitions are legal.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An approval record is created once per governed submission and mutated
//! only through the transitions named in [`ApprovalStatus::allowed_next`].
//! The record itself never validates those transitions against a clock or a
//! store; that is the store's job. This module only knows the shape of the
//! data and the legal edges of the graph.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ApprovalId;
use crate::identifiers::ConnectorName;
use crate::identifiers::MunicipalityId;
use crate::identifiers::OperatorId;
use crate::identifiers::RequestId;
use crate::identifiers::StepId;
use crate::identifiers::TenantId;
use crate::identifiers::WorkspaceId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Action Intent
// ============================================================================

/// Opaque domain label naming the action a submission requests, e.g.
/// `deploy_policy`, `seal_record`, `open_repository`.
///
/// # Invariants
/// - Not a closed enumeration: new intents may be introduced without a
///   breaking change, since the authorization evaluator derives required
///   permissions by prefix matching (`notify_*`, `archive_*`) with a
///   catch-all default.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionIntent(String);

impl ActionIntent {
    /// Creates a new action intent label.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the intent label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActionIntent {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Action Mode
// ============================================================================

/// How a submission's plan should be handled once authorized.
///
/// # Invariants
/// - `Governed` submissions are the only ones subject to the approval gate;
///   `Launch` and `DryRun` execute immediately and never create an
///   [`ApprovalRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionMode {
    /// Requires human approval before dispatch.
    Governed,
    /// Executes immediately without gating.
    Launch,
    /// Executes the plan path without contacting external connectors.
    DryRun,
}

// ============================================================================
// SECTION: Plan Step
// ============================================================================

/// Connector name reserved to mean "no dispatch is required for this step".
pub const NO_CONNECTOR: &str = "none";

/// The state of a single plan step as it moves through dispatch.
///
/// # Invariants
/// - `Ready` is the only status the dispatch executor will attempt; all
///   others are treated as already resolved and are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    /// Awaiting dispatch.
    Ready,
    /// Successfully dispatched.
    Dispatched,
    /// Dispatch attempted and exhausted its retry budget without success.
    Failed,
    /// Dispatch was not attempted (no connector, no handler, or already resolved).
    Skipped,
}

impl PlanStepStatus {
    /// Returns the lowercase wire name of the status, used in "already
    /// {status}" skip reasons.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Dispatched => "dispatched",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One step of a plan, carrying an opaque connector-specific payload.
///
/// # Invariants
/// - `status` starts `Ready` at submission time and is mutated only by the
///   dispatch executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Identifier for this step within its approval's plan.
    pub step_id: StepId,
    /// Human-readable description of the step.
    pub description: String,
    /// Connector the step dispatches to, or [`NO_CONNECTOR`].
    pub connector: ConnectorName,
    /// Current dispatch status.
    pub status: PlanStepStatus,
    /// Opaque connector-specific payload, validated at the HTTP boundary by
    /// per-intent schemas, not by this crate.
    pub plan: serde_json::Value,
}

impl PlanStep {
    /// Creates a new plan step in the `Ready` state.
    #[must_use]
    pub fn new(
        step_id: impl Into<StepId>,
        description: impl Into<String>,
        connector: impl Into<ConnectorName>,
        plan: serde_json::Value,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            description: description.into(),
            connector: connector.into(),
            status: PlanStepStatus::Ready,
            plan,
        }
    }

    /// Returns `true` when this step carries the sentinel "no connector"
    /// marker and therefore requires no dispatch.
    #[must_use]
    pub fn has_no_connector(&self) -> bool {
        self.connector.as_str() == NO_CONNECTOR
    }
}

// ============================================================================
// SECTION: Approval Status
// ============================================================================

/// The lifecycle status of an approval record.
///
/// # Invariants
/// - Progresses monotonically through [`ApprovalStatus::allowed_next`] edges
///   only; no store implementation may set a status outside that graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision (or chain completion).
    Pending,
    /// Decided favorably; eligible for dispatch.
    Approved,
    /// Decided unfavorably; terminal.
    Rejected,
    /// TTL elapsed before a decision; terminal.
    Expired,
    /// Dispatch in progress; claimed by exactly one caller.
    Dispatching,
    /// Dispatch completed with no failed step; terminal.
    Dispatched,
    /// Dispatch completed with at least one failed step; terminal.
    DispatchFailed,
}

impl ApprovalStatus {
    /// Returns `true` if no further transition is possible from this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Expired | Self::Dispatched | Self::DispatchFailed
        )
    }

    /// Returns `true` when `next` is a legal transition target from `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Expired)
                | (Self::Approved, Self::Dispatching)
                | (Self::Dispatching, Self::Dispatched)
                | (Self::Dispatching, Self::DispatchFailed)
        )
    }

    /// Returns the lowercase wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Dispatching => "dispatching",
            Self::Dispatched => "dispatched",
            Self::DispatchFailed => "dispatch_failed",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Approval Record
// ============================================================================

/// A durable record of one human-gated action request.
///
/// # Invariants
/// - `request_id` is unique per `(operator_id, tenant_id)`.
/// - `dispatched_at` is `Some` if and only if `approval_status` is
///   `Dispatched` or `DispatchFailed`.
/// - `expires_at` is fixed at creation time and never advanced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Server-assigned opaque identifier.
    pub id: ApprovalId,
    /// Caller-supplied identifier, unique per `(operator_id, tenant_id)`.
    pub request_id: RequestId,
    /// Operator who submitted the request.
    pub operator_id: OperatorId,
    /// Workspace the request is scoped to.
    pub workspace_id: WorkspaceId,
    /// Tenant the request is scoped to.
    pub tenant_id: TenantId,
    /// Municipality the request is scoped to.
    pub municipality_id: MunicipalityId,
    /// Domain label naming the requested action.
    pub action_intent: ActionIntent,
    /// Governed, launch, or dry-run handling.
    pub action_mode: ActionMode,
    /// 64-hex-character fingerprint of `plan_steps`.
    pub plan_hash: String,
    /// Ordered plan steps.
    pub plan_steps: Vec<PlanStep>,
    /// Opaque audit trail payload captured at submission time.
    pub audit_record: serde_json::Value,
    /// Opaque authorization decision captured at submission time.
    pub decision_result: serde_json::Value,
    /// Current lifecycle status.
    pub approval_status: ApprovalStatus,
    /// Operator who decided the approval, once decided.
    pub approver_id: Option<OperatorId>,
    /// Free-text note attached by the decider.
    pub approval_note: Option<String>,
    /// Instant dispatch resolved (successfully or not).
    pub dispatched_at: Option<Timestamp>,
    /// Opaque dispatch outcome payload, once resolved.
    pub dispatch_result: Option<serde_json::Value>,
    /// Creation instant.
    pub created_at: Timestamp,
    /// Expiry instant; `pending` rows past this instant expire.
    pub expires_at: Timestamp,
}

impl ApprovalRecord {
    /// Default time-to-live for a newly created approval, in seconds (24h).
    pub const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;

    /// Returns `true` when `approval_status` is `Pending` and `now` has
    /// passed `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.approval_status == ApprovalStatus::Pending && now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::ApprovalStatus;
    use super::PlanStep;
    use serde_json::json;

    #[test]
    fn pending_allows_only_the_three_decision_edges() {
        assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Approved));
        assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Rejected));
        assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Expired));
        assert!(!ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Dispatching));
    }

    #[test]
    fn terminal_states_accept_no_further_transition() {
        for terminal in [
            ApprovalStatus::Rejected,
            ApprovalStatus::Expired,
            ApprovalStatus::Dispatched,
            ApprovalStatus::DispatchFailed,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(ApprovalStatus::Pending));
        }
    }

    #[test]
    fn dispatch_path_is_approved_to_dispatching_to_terminal() {
        assert!(ApprovalStatus::Approved.can_transition_to(ApprovalStatus::Dispatching));
        assert!(ApprovalStatus::Dispatching.can_transition_to(ApprovalStatus::Dispatched));
        assert!(ApprovalStatus::Dispatching.can_transition_to(ApprovalStatus::DispatchFailed));
        assert!(!ApprovalStatus::Approved.can_transition_to(ApprovalStatus::Dispatched));
    }

    #[test]
    fn no_connector_step_is_recognized() {
        let step = PlanStep::new("s1", "seal", "none", json!({}));
        assert!(step.has_no_connector());
    }
}
