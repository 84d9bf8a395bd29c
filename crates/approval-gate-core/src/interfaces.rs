// crates/approval-gate-core/src/interfaces.rs
// ============================================================================
// Module: Approval Gate Interfaces
// Description: Backend-agnostic interfaces for approval, chain, idempotency
// storage, and dispatch.
// Purpose: Define the contract surfaces implemented by durable backends and
// consumed by the HTTP surface and dispatch executor.
// Dependencies: crate::approval, crate::chain, crate::idempotency
// ============================================================================

//! ## Overview
//! Interfaces define how the approval lifecycle engine integrates with a
//! durable backend and with connector dispatch handlers without embedding
//! backend-specific details. Every store operation that mutates lifecycle
//! state is expressed as a conditional transition so that concurrent callers
//! cannot both observe success; see the state machine in
//! [`crate::approval::ApprovalStatus`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::approval::ActionIntent;
use crate::approval::ActionMode;
use crate::approval::ApprovalRecord;
use crate::approval::ApprovalStatus;
use crate::approval::PlanStep;
use crate::chain::ChainProgress;
use crate::chain::ChainStepInstance;
use crate::chain::ChainTemplate;
use crate::chain::ChainTemplateStep;
use crate::chain::StepDecisionOutcome;
use crate::identifiers::ApprovalId;
use crate::identifiers::ConnectorName;
use crate::identifiers::MunicipalityId;
use crate::identifiers::OperatorId;
use crate::identifiers::RequestId;
use crate::identifiers::StepId;
use crate::identifiers::TemplateId;
use crate::identifiers::TenantId;
use crate::identifiers::WorkspaceId;
use crate::idempotency::IdempotencyEntry;
use crate::idempotency::IdempotencyKey;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Approval Store
// ============================================================================

/// Input to [`ApprovalStore::create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApprovalInput {
    /// Caller-supplied request identifier.
    pub request_id: RequestId,
    /// Operator submitting the request.
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
    /// Ordered plan steps.
    pub plan_steps: Vec<PlanStep>,
    /// Opaque audit trail payload.
    pub audit_record: serde_json::Value,
    /// Opaque authorization decision payload.
    pub decision_result: serde_json::Value,
    /// Time-to-live in seconds before a pending approval expires.
    pub ttl_seconds: i64,
    /// Creation instant.
    pub created_at: Timestamp,
}

/// Input to [`ApprovalStore::query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalQuery {
    /// Restrict to a single status, if set.
    pub approval_status: Option<ApprovalStatus>,
    /// Restrict to a single operator, if set.
    pub operator_id: Option<OperatorId>,
    /// Maximum rows to return.
    pub limit: Option<u32>,
    /// Rows to skip, for pagination.
    pub offset: Option<u32>,
}

/// Input to [`ApprovalStore::decide`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideApprovalInput {
    /// Approval being decided.
    pub approval_id: ApprovalId,
    /// Operator recording the decision.
    pub approver_id: OperatorId,
    /// Must be `Approved` or `Rejected`.
    pub status: ApprovalStatus,
    /// Free-text note attached by the decider.
    pub note: Option<String>,
    /// Instant the decision is recorded at.
    pub decided_at: Timestamp,
}

/// Approval store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; the HTTP surface maps
///   each to a status code per the error taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `request_id` collided within the same `(operator_id, tenant_id)`.
    #[error("duplicate request_id")]
    DuplicateRequest,
    /// Underlying durability I/O failed.
    #[error("durable store io error: {0}")]
    Io(String),
    /// Persisted data could not be decoded.
    #[error("durable store decode error: {0}")]
    Decode(String),
}

/// Durable, single-writer-per-row persistence for approval records.
///
/// All transition methods are compare-and-set: at most one concurrent
/// caller observes a non-`None` success for any given starting state.
pub trait ApprovalStore {
    /// Creates a new approval record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateRequest`] when `request_id` collides
    /// within the same `(operator_id, tenant_id)`, or [`StoreError::Io`] on
    /// underlying durability failure.
    fn create(&self, input: CreateApprovalInput) -> Result<ApprovalRecord, StoreError>;

    /// Finds an approval by its server-assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRecord>, StoreError>;

    /// Finds an approval by its caller-supplied request id within a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn find_by_request_id(
        &self,
        tenant_id: &TenantId,
        operator_id: &OperatorId,
        request_id: &RequestId,
    ) -> Result<Option<ApprovalRecord>, StoreError>;

    /// Lists approvals matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn query(&self, query: &ApprovalQuery) -> Result<Vec<ApprovalRecord>, StoreError>;

    /// Counts approvals currently `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn count_pending(&self) -> Result<u64, StoreError>;

    /// Decides a pending approval, or expires it if its TTL has elapsed.
    ///
    /// Returns `None` when the approval is not `pending` at the time of the
    /// call (including when it has just been transitioned to `expired` by
    /// this very invocation).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn decide(
        &self,
        input: DecideApprovalInput,
    ) -> Result<Option<ApprovalRecord>, StoreError>;

    /// Atomically transitions `approved -> dispatching`.
    ///
    /// Returns `None` when the approval is not currently `approved`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn mark_dispatching(&self, id: &ApprovalId) -> Result<Option<ApprovalRecord>, StoreError>;

    /// The single guarded entry point used by the dispatch path: exactly one
    /// caller observes `Some` across the lifetime of the process group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn consume_for_dispatch(&self, id: &ApprovalId) -> Result<Option<ApprovalRecord>, StoreError> {
        self.mark_dispatching(id)
    }

    /// Transitions `dispatching -> dispatched`, stamping `dispatched_at` and
    /// persisting `result`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn mark_dispatched(
        &self,
        id: &ApprovalId,
        result: serde_json::Value,
        at: Timestamp,
    ) -> Result<Option<ApprovalRecord>, StoreError>;

    /// Transitions `dispatching -> dispatch_failed`, stamping
    /// `dispatched_at` and persisting `error`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn mark_dispatch_failed(
        &self,
        id: &ApprovalId,
        error: serde_json::Value,
        at: Timestamp,
    ) -> Result<Option<ApprovalRecord>, StoreError>;

    /// Transitions every `pending` row whose `expires_at < now` to
    /// `expired`, returning the count transitioned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on underlying durability failure.
    fn expire_pending(&self, now: Timestamp) -> Result<u64, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Chain Store
// ============================================================================

/// Input to [`ChainStore::create_template`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateInput {
    /// Explicit id, or `None` to generate one.
    pub id: Option<TemplateId>,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Unsorted template steps; validated and sorted by the store.
    pub steps: Vec<ChainTemplateStep>,
}

/// Input to [`ChainStore::decide_step`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideStepInput {
    /// Step instance being decided.
    pub step_id: StepId,
    /// Operator recording the decision.
    pub decider_id: OperatorId,
    /// Must be `Approved` or `Rejected`.
    pub status: crate::chain::ChainStepStatus,
    /// Free-text note attached by the decider.
    pub note: Option<String>,
    /// Instant the decision is recorded at.
    pub decided_at: Timestamp,
}

/// Chain store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Proposed template steps do not form a contiguous order range.
    #[error("chain template step orders must form a contiguous range starting at 0")]
    NonSequentialOrders,
    /// The referenced template does not exist.
    #[error("chain template not found")]
    TemplateNotFound,
    /// The default template cannot be updated or deleted.
    #[error("the default chain template cannot be modified")]
    DefaultTemplateImmutable,
    /// The template is referenced by a non-terminal chain.
    #[error("chain template is in use by an active chain")]
    InUse,
    /// A chain already exists for this approval.
    #[error("a chain already exists for this approval")]
    ChainExists,
    /// Underlying durability I/O failed.
    #[error("durable store io error: {0}")]
    Io(String),
}

/// Durable persistence of chain templates and per-approval step instances.
///
/// Shares a durable handle with [`ApprovalStore`] so that chain-to-approval
/// propagation participates in the same transaction.
pub trait ChainStore {
    /// Creates a new chain template.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NonSequentialOrders`] when `input.steps`'
    /// orders are not a contiguous `{0,...,K-1}` range, or [`ChainError::Io`]
    /// on underlying durability failure.
    fn create_template(&self, input: CreateTemplateInput) -> Result<ChainTemplate, ChainError>;

    /// Fetches a template by id.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn get_template(&self, id: &TemplateId) -> Result<Option<ChainTemplate>, ChainError>;

    /// Lists all templates.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn list_templates(&self) -> Result<Vec<ChainTemplate>, ChainError>;

    /// Updates a non-default template's name, description, and steps.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::DefaultTemplateImmutable`] for the default
    /// template, [`ChainError::TemplateNotFound`] if `id` is unknown, or
    /// [`ChainError::NonSequentialOrders`] for a malformed `steps`.
    fn update_template(
        &self,
        id: &TemplateId,
        input: CreateTemplateInput,
    ) -> Result<ChainTemplate, ChainError>;

    /// Deletes a non-default, unreferenced template.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::DefaultTemplateImmutable`] for the default
    /// template, or [`ChainError::InUse`] when a non-terminal chain
    /// references it.
    fn delete_template(&self, id: &TemplateId) -> Result<(), ChainError>;

    /// Instantiates a chain for an approval from a template (defaulting to
    /// the default template), activating all order-0 steps.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::ChainExists`] when a chain already exists for
    /// `approval_id`, or [`ChainError::TemplateNotFound`] when `template_id`
    /// does not exist.
    fn create_chain_for_approval(
        &self,
        approval_id: &ApprovalId,
        template_id: &TemplateId,
        created_at: Timestamp,
    ) -> Result<Vec<ChainStepInstance>, ChainError>;

    /// Returns the step instances for an approval, ordered by `step_order`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn get_steps_for_approval(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Vec<ChainStepInstance>, ChainError>;

    /// Returns the first `active` step for an approval, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn get_active_step(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Option<ChainStepInstance>, ChainError>;

    /// Returns all `active` steps for an approval's current order-group.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn get_active_steps(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Vec<ChainStepInstance>, ChainError>;

    /// Fetches a single step instance by id.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn get_step(&self, step_id: &StepId) -> Result<Option<ChainStepInstance>, ChainError>;

    /// Summarizes a chain's progress for an approval.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn get_chain_progress(
        &self,
        approval_id: &ApprovalId,
    ) -> Result<Option<ChainProgress>, ChainError>;

    /// Counts globally `active` steps across all chains.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn count_active_steps(&self) -> Result<u64, ChainError>;

    /// Decides a single step: compare-and-set `active -> {approved,
    /// rejected}`, with order-group advancement or rejection propagation as
    /// a side effect. Returns `None` when the step is not currently
    /// `active` or is not found.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on underlying durability failure.
    fn decide_step(
        &self,
        input: DecideStepInput,
    ) -> Result<Option<StepDecisionOutcome>, ChainError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), ChainError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Idempotency Store
// ============================================================================

/// Idempotency store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// Underlying durability I/O failed.
    #[error("durable store io error: {0}")]
    Io(String),
}

/// Durable deduplication of submissions by
/// `(operator_id, tenant_id, request_id, schema_version)`.
pub trait IdempotencyStore {
    /// Looks up a stored entry by key, regardless of schema version; the
    /// caller compares `schema_version` to classify replay vs. conflict.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError`] on underlying durability failure.
    fn find(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyEntry>, IdempotencyError>;

    /// Records a new entry, overwriting any prior entry for the same key.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError`] on underlying durability failure.
    fn put(&self, entry: IdempotencyEntry) -> Result<(), IdempotencyError>;

    /// Removes entries older than their TTL, returning the count removed.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError`] on underlying durability failure.
    fn prune_expired(&self, now: Timestamp) -> Result<u64, IdempotencyError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), IdempotencyError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Status of a single step's dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResultStatus {
    /// The handler reported success.
    Dispatched,
    /// The handler reported failure or threw after exhausting retries.
    Failed,
    /// The step was not attempted.
    Skipped,
}

/// Context passed to a dispatcher handler for one dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchContext {
    /// Approval being dispatched.
    pub approval_id: ApprovalId,
    /// Original caller-supplied request id, for correlation in logs.
    pub request_id: RequestId,
    /// Operator who triggered dispatch.
    pub operator_id: OperatorId,
    /// When `true`, handlers must not mutate external systems.
    pub dry_run: bool,
}

/// The outcome of dispatching (or skipping) one plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step this result is for.
    pub step_id: StepId,
    /// Connector the step targeted.
    pub connector: ConnectorName,
    /// Outcome status.
    pub status: StepResultStatus,
    /// Opaque handler-specific success payload.
    pub result: Option<serde_json::Value>,
    /// Human-readable failure or skip reason.
    pub error: Option<String>,
    /// Instant this result was recorded.
    pub completed_at: Timestamp,
}

/// The outcome of a handler's liveness probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerHealth {
    /// `true` when the handler is ready to accept dispatch calls.
    pub healthy: bool,
    /// Optional human-readable detail, typically populated when unhealthy.
    pub detail: Option<String>,
}

/// Dispatcher handler errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; a thrown error is
///   converted to a `Failed` [`StepResult`] by the dispatch executor, never
///   propagated to the HTTP layer directly.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The handler could not complete the dispatch attempt.
    #[error("dispatch failed: {0}")]
    HandlerFailure(String),
    /// The handler's transport could not be reached.
    #[error("dispatch transport error: {0}")]
    Transport(String),
}

/// A connector-specific dispatch handler.
pub trait DispatchHandler: Send + Sync {
    /// The connector name this handler serves.
    fn connector_name(&self) -> ConnectorName;

    /// Attempts to dispatch one plan step.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the attempt fails; the dispatch
    /// executor treats this identically to a returned `Failed` status.
    fn dispatch(
        &self,
        step: &PlanStep,
        context: &DispatchContext,
    ) -> Result<StepResult, DispatchError>;

    /// Probes the handler's readiness to accept dispatch calls.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the probe itself fails to execute;
    /// an executed-but-unhealthy probe returns `Ok` with
    /// `HandlerHealth::healthy == false`.
    fn health_check(&self) -> Result<HandlerHealth, DispatchError> {
        Ok(HandlerHealth {
            healthy: true,
            detail: None,
        })
    }
}

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Per-connector retry policy controlling exponential backoff inside the
/// dispatch executor.
///
/// # Invariants
/// - `max_attempts >= 1`; a value of `1` means "no retry".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay in milliseconds; attempt `n` sleeps
    /// `base_delay_ms * 2^(n-1)` before attempt `n+1`.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// The default policy applied when a connector has none registered:
    /// one attempt, no retry.
    pub const DEFAULT: Self = Self {
        max_attempts: 1,
        base_delay_ms: 0,
    };

    /// Returns the backoff delay, in milliseconds, to sleep before
    /// attempt `next_attempt` (1-indexed).
    #[must_use]
    pub fn backoff_delay_ms(self, next_attempt: u32) -> u64 {
        let exponent = next_attempt.saturating_sub(1);
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
