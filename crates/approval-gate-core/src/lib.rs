// crates/approval-gate-core/src/lib.rs
// ============================================================================
// Module: Approval Gate Core
// Description: Shared data model and backend-agnostic interfaces for the
// approval lifecycle engine.
// Purpose: Give every other crate (store, dispatch, http, cli) one
// definition of an approval, a chain, an idempotency entry, and the trait
// surfaces that connect them.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time
// ============================================================================

//! # Approval Gate Core
//!
//! This crate has no I/O of its own. It defines:
//! - the identifiers ([`identifiers`]) and timestamps ([`time`]) used
//!   throughout the engine;
//! - the approval record and its status state machine ([`approval`]);
//! - the chain template and step-instance data model ([`chain`]);
//! - the idempotency key and entry shape ([`idempotency`]);
//! - the canonical-JSON plan hash helper ([`hashing`]);
//! - the backend-agnostic store and dispatch interfaces ([`interfaces`]).

pub mod approval;
pub mod chain;
pub mod hashing;
pub mod identifiers;
pub mod idempotency;
pub mod interfaces;
pub mod time;

pub use approval::ActionIntent;
pub use approval::ActionMode;
pub use approval::ApprovalRecord;
pub use approval::ApprovalStatus;
pub use approval::PlanStep;
pub use approval::PlanStepStatus;
pub use chain::ChainProgress;
pub use chain::ChainStepInstance;
pub use chain::ChainStepStatus;
pub use chain::ChainTemplate;
pub use chain::ChainTemplateStep;
pub use chain::StepDecisionOutcome;
pub use chain::TemplateOrderError;
pub use chain::validate_orders;
pub use hashing::HashError;
pub use hashing::plan_hash;
pub use identifiers::ApprovalId;
pub use identifiers::ConnectorName;
pub use identifiers::DEFAULT_TEMPLATE_ID;
pub use identifiers::DelegationId;
pub use identifiers::MunicipalityId;
pub use identifiers::OperatorId;
pub use identifiers::RequestId;
pub use identifiers::StepId;
pub use identifiers::TemplateId;
pub use identifiers::TenantId;
pub use identifiers::WorkspaceId;
pub use idempotency::IdempotencyEntry;
pub use idempotency::IdempotencyKey;
pub use idempotency::IdempotencyLookup;
pub use idempotency::classify_lookup;
pub use interfaces::ApprovalQuery;
pub use interfaces::ApprovalStore;
pub use interfaces::ChainError;
pub use interfaces::ChainStore;
pub use interfaces::CreateApprovalInput;
pub use interfaces::CreateTemplateInput;
pub use interfaces::DecideApprovalInput;
pub use interfaces::DecideStepInput;
pub use interfaces::DispatchContext;
pub use interfaces::DispatchError;
pub use interfaces::DispatchHandler;
pub use interfaces::HandlerHealth;
pub use interfaces::IdempotencyError;
pub use interfaces::IdempotencyStore;
pub use interfaces::RetryPolicy;
pub use interfaces::StepResult;
pub use interfaces::StepResultStatus;
pub use interfaces::StoreError;
pub use time::Timestamp;
