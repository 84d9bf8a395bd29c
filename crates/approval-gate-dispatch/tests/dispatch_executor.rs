// crates/approval-gate-dispatch/tests/dispatch_executor.rs
// ============================================================================
// Module: Dispatch Executor Integration Tests
// Description: Exercises dispatch_approval against a single-approval store
// double and scripted connector handlers.
// Purpose: Cover sequential dispatch, retry-then-succeed, retry-exhausted,
// every skip reason, dry_run propagation, and success/failure classification.
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

use std::sync::Arc;
use std::sync::Mutex;

use approval_gate_core::ApprovalId;
use approval_gate_core::ApprovalQuery;
use approval_gate_core::ApprovalRecord;
use approval_gate_core::ApprovalStatus;
use approval_gate_core::ApprovalStore;
use approval_gate_core::DecideApprovalInput;
use approval_gate_core::MunicipalityId;
use approval_gate_core::OperatorId;
use approval_gate_core::PlanStep;
use approval_gate_core::RequestId;
use approval_gate_core::RetryPolicy;
use approval_gate_core::StoreError;
use approval_gate_core::TenantId;
use approval_gate_core::Timestamp;
use approval_gate_core::WorkspaceId;
use approval_gate_core::interfaces::CreateApprovalInput;
use approval_gate_dispatch::DispatchExecutorError;
use approval_gate_dispatch::DispatcherRegistry;
use approval_gate_dispatch::dispatch_approval;
use approval_gate_dispatch::handlers::StubHandler;
use approval_gate_dispatch::handlers::StubOutcome;

/// Single-approval store double: enough of [`ApprovalStore`] to drive the
/// dispatch executor's CAS path without a real durable backend.
struct SingleApprovalStore {
    record: Mutex<ApprovalRecord>,
}

impl SingleApprovalStore {
    fn new(record: ApprovalRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }

    fn snapshot(&self) -> ApprovalRecord {
        self.record.lock().unwrap().clone()
    }
}

impl ApprovalStore for SingleApprovalStore {
    fn create(&self, _input: CreateApprovalInput) -> Result<ApprovalRecord, StoreError> {
        Err(StoreError::Io("unsupported in test double".to_string()))
    }

    fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRecord>, StoreError> {
        let record = self.record.lock().unwrap();
        Ok((record.id == *id).then(|| record.clone()))
    }

    fn find_by_request_id(
        &self,
        _tenant_id: &TenantId,
        _operator_id: &OperatorId,
        _request_id: &RequestId,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        Err(StoreError::Io("unsupported in test double".to_string()))
    }

    fn query(&self, _query: &ApprovalQuery) -> Result<Vec<ApprovalRecord>, StoreError> {
        Ok(vec![self.snapshot()])
    }

    fn count_pending(&self) -> Result<u64, StoreError> {
        let record = self.record.lock().unwrap();
        Ok(u64::from(record.approval_status == ApprovalStatus::Pending))
    }

    fn decide(
        &self,
        _input: DecideApprovalInput,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        Err(StoreError::Io("unsupported in test double".to_string()))
    }

    fn mark_dispatching(&self, id: &ApprovalId) -> Result<Option<ApprovalRecord>, StoreError> {
        let mut record = self.record.lock().unwrap();
        if record.id != *id || record.approval_status != ApprovalStatus::Approved {
            return Ok(None);
        }
        record.approval_status = ApprovalStatus::Dispatching;
        Ok(Some(record.clone()))
    }

    fn mark_dispatched(
        &self,
        id: &ApprovalId,
        result: serde_json::Value,
        at: Timestamp,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        let mut record = self.record.lock().unwrap();
        if record.id != *id || record.approval_status != ApprovalStatus::Dispatching {
            return Ok(None);
        }
        record.approval_status = ApprovalStatus::Dispatched;
        record.dispatched_at = Some(at);
        record.dispatch_result = Some(result);
        Ok(Some(record.clone()))
    }

    fn mark_dispatch_failed(
        &self,
        id: &ApprovalId,
        error: serde_json::Value,
        at: Timestamp,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        let mut record = self.record.lock().unwrap();
        if record.id != *id || record.approval_status != ApprovalStatus::Dispatching {
            return Ok(None);
        }
        record.approval_status = ApprovalStatus::DispatchFailed;
        record.dispatched_at = Some(at);
        record.dispatch_result = Some(error);
        Ok(Some(record.clone()))
    }

    fn expire_pending(&self, _now: Timestamp) -> Result<u64, StoreError> {
        Ok(0)
    }
}

fn sample_approval(status: ApprovalStatus, plan_steps: Vec<PlanStep>) -> ApprovalRecord {
    ApprovalRecord {
        id: ApprovalId::from("appr-1"),
        request_id: RequestId::from("req-1"),
        operator_id: OperatorId::from("op-1"),
        workspace_id: WorkspaceId::from("ws-1"),
        tenant_id: TenantId::from("tenant-1"),
        municipality_id: MunicipalityId::from("muni-1"),
        action_intent: approval_gate_core::ActionIntent::from("deploy"),
        action_mode: approval_gate_core::ActionMode::Governed,
        plan_hash: "hash".to_string(),
        plan_steps,
        audit_record: serde_json::json!({}),
        decision_result: serde_json::json!({}),
        approval_status: status,
        approver_id: Some(OperatorId::from("approver-1")),
        approval_note: None,
        dispatched_at: None,
        dispatch_result: None,
        created_at: Timestamp::now(),
        expires_at: Timestamp::now().plus_seconds(3600),
    }
}

#[test]
fn not_approved_is_rejected_before_any_dispatch() {
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Pending, vec![]));
    let registry = DispatcherRegistry::new();

    let err = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false)
        .unwrap_err();
    assert!(matches!(err, DispatchExecutorError::NotClaimable));
}

#[test]
fn every_step_dispatches_and_approval_reaches_dispatched() {
    let steps = vec![
        PlanStep::new("s1", "first", "webhook", serde_json::json!({})),
        PlanStep::new("s2", "second", "webhook", serde_json::json!({})),
    ];
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Approved, steps));
    let mut registry = DispatcherRegistry::new();
    registry.register(
        Arc::new(StubHandler::new("webhook", vec![StubOutcome::Dispatched])),
        None,
    );

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.summary, "2 dispatched, 0 failed, 0 skipped");
    assert_eq!(outcome.approval.approval_status, ApprovalStatus::Dispatched);
}

#[test]
fn retry_then_succeed_honors_max_attempts() {
    let steps = vec![PlanStep::new("s1", "first", "webhook", serde_json::json!({}))];
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Approved, steps));
    let mut registry = DispatcherRegistry::new();
    let handler = Arc::new(StubHandler::new(
        "webhook",
        vec![StubOutcome::FailedResult, StubOutcome::Dispatched],
    ));
    registry.register(
        Arc::clone(&handler) as Arc<dyn approval_gate_core::DispatchHandler>,
        Some(RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
        }),
    );

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false).unwrap();
    assert!(outcome.success);
    assert_eq!(handler.call_count(), 2);
}

#[test]
fn retry_exhausted_marks_dispatch_failed() {
    let steps = vec![PlanStep::new("s1", "first", "webhook", serde_json::json!({}))];
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Approved, steps));
    let mut registry = DispatcherRegistry::new();
    let handler = Arc::new(StubHandler::new("webhook", vec![StubOutcome::FailedResult]));
    registry.register(
        Arc::clone(&handler) as Arc<dyn approval_gate_core::DispatchHandler>,
        Some(RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
        }),
    );

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.summary, "0 dispatched, 1 failed, 0 skipped");
    assert_eq!(handler.call_count(), 2);
    assert_eq!(outcome.approval.approval_status, ApprovalStatus::DispatchFailed);
}

#[test]
fn throwing_handler_is_treated_like_a_failed_result() {
    let steps = vec![PlanStep::new("s1", "first", "webhook", serde_json::json!({}))];
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Approved, steps));
    let mut registry = DispatcherRegistry::new();
    registry.register(Arc::new(StubHandler::new("webhook", vec![StubOutcome::Throws])), None);

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.results[0].error.as_deref(), Some("stub handler scripted throw"));
}

#[test]
fn no_connector_configured_is_skipped() {
    let no_connector_step = PlanStep::new("s1", "first", "none", serde_json::json!({}));
    let store = SingleApprovalStore::new(sample_approval(
        ApprovalStatus::Approved,
        vec![no_connector_step],
    ));
    let registry = DispatcherRegistry::new();

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.results[0].error.as_deref(), Some("No connector configured"));
}

#[test]
fn unregistered_connector_is_skipped() {
    let steps = vec![PlanStep::new("s1", "first", "slack", serde_json::json!({}))];
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Approved, steps));
    let registry = DispatcherRegistry::new();

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.results[0].error.as_deref(), Some("No dispatcher registered"));
}

#[test]
fn non_ready_step_is_skipped_with_its_status() {
    let mut step = PlanStep::new("s1", "first", "webhook", serde_json::json!({}));
    step.status = approval_gate_core::PlanStepStatus::Dispatched;
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Approved, vec![step]));
    let mut registry = DispatcherRegistry::new();
    registry.register(Arc::new(StubHandler::new("webhook", vec![StubOutcome::Dispatched])), None);

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), false).unwrap();
    assert_eq!(outcome.results[0].error.as_deref(), Some("already dispatched"));
}

#[test]
fn dry_run_is_propagated_to_the_webhook_handler() {
    use approval_gate_dispatch::handlers::WebhookConfig;
    use approval_gate_dispatch::handlers::WebhookHandler;

    let steps = vec![PlanStep::new("s1", "first", "webhook", serde_json::json!({}))];
    let store = SingleApprovalStore::new(sample_approval(ApprovalStatus::Approved, steps));
    let mut registry = DispatcherRegistry::new();
    let handler = WebhookHandler::new(WebhookConfig {
        connector_name: approval_gate_core::identifiers::ConnectorName::from("webhook"),
        url: "http://127.0.0.1:1".to_string(),
        timeout: std::time::Duration::from_millis(200),
    })
    .unwrap();
    registry.register(Arc::new(handler), None);

    let outcome = dispatch_approval(&store, &registry, &ApprovalId::from("appr-1"), true).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.results[0].status, approval_gate_core::StepResultStatus::Dispatched);
}
