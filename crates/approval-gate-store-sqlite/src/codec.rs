// crates/approval-gate-store-sqlite/src/codec.rs
// ============================================================================
// Module: Row Codec Helpers
// Description: String/JSON encodings for enum and payload columns shared by
// every table in this store.
// Purpose: Give each store module one place to convert core types to and
// from the TEXT/BLOB columns `SQLite` actually stores.
// Dependencies: approval_gate_core, serde_json
// ============================================================================

use approval_gate_core::ActionMode;
use approval_gate_core::ApprovalStatus;
use approval_gate_core::ChainStepStatus;

/// Returns the lowercase wire name of an [`ActionMode`].
#[must_use]
pub fn action_mode_to_str(mode: ActionMode) -> &'static str {
    match mode {
        ActionMode::Governed => "governed",
        ActionMode::Launch => "launch",
        ActionMode::DryRun => "dry-run",
    }
}

/// Parses an [`ActionMode`] from its lowercase wire name.
pub fn str_to_action_mode(value: &str) -> Result<ActionMode, String> {
    match value {
        "governed" => Ok(ActionMode::Governed),
        "launch" => Ok(ActionMode::Launch),
        "dry-run" => Ok(ActionMode::DryRun),
        other => Err(format!("unknown action_mode: {other}")),
    }
}

/// Parses an [`ApprovalStatus`] from its [`ApprovalStatus::as_str`] form.
pub fn str_to_approval_status(value: &str) -> Result<ApprovalStatus, String> {
    match value {
        "pending" => Ok(ApprovalStatus::Pending),
        "approved" => Ok(ApprovalStatus::Approved),
        "rejected" => Ok(ApprovalStatus::Rejected),
        "expired" => Ok(ApprovalStatus::Expired),
        "dispatching" => Ok(ApprovalStatus::Dispatching),
        "dispatched" => Ok(ApprovalStatus::Dispatched),
        "dispatch_failed" => Ok(ApprovalStatus::DispatchFailed),
        other => Err(format!("unknown approval_status: {other}")),
    }
}

/// Returns the lowercase wire name of a [`ChainStepStatus`].
#[must_use]
pub fn chain_step_status_to_str(status: ChainStepStatus) -> &'static str {
    match status {
        ChainStepStatus::Pending => "pending",
        ChainStepStatus::Active => "active",
        ChainStepStatus::Approved => "approved",
        ChainStepStatus::Rejected => "rejected",
        ChainStepStatus::Skipped => "skipped",
    }
}

/// Parses a [`ChainStepStatus`] from its lowercase wire name.
pub fn str_to_chain_step_status(value: &str) -> Result<ChainStepStatus, String> {
    match value {
        "pending" => Ok(ChainStepStatus::Pending),
        "active" => Ok(ChainStepStatus::Active),
        "approved" => Ok(ChainStepStatus::Approved),
        "rejected" => Ok(ChainStepStatus::Rejected),
        "skipped" => Ok(ChainStepStatus::Skipped),
        other => Err(format!("unknown chain step status: {other}")),
    }
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
    fn action_mode_round_trips() {
        for mode in [ActionMode::Governed, ActionMode::Launch, ActionMode::DryRun] {
            let encoded = action_mode_to_str(mode);
            assert_eq!(str_to_action_mode(encoded).unwrap(), mode);
        }
    }

    #[test]
    fn approval_status_round_trips() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
            ApprovalStatus::Expired,
            ApprovalStatus::Dispatching,
            ApprovalStatus::Dispatched,
            ApprovalStatus::DispatchFailed,
        ] {
            let encoded = status.as_str();
            assert_eq!(str_to_approval_status(encoded).unwrap(), status);
        }
    }

    #[test]
    fn chain_step_status_round_trips() {
        for status in [
            ChainStepStatus::Pending,
            ChainStepStatus::Active,
            ChainStepStatus::Approved,
            ChainStepStatus::Rejected,
            ChainStepStatus::Skipped,
        ] {
            let encoded = chain_step_status_to_str(status);
            assert_eq!(str_to_chain_step_status(encoded).unwrap(), status);
        }
    }
}
