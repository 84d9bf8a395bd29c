// crates/approval-gate-dispatch/src/lib.rs
// ============================================================================
// Module: Approval Gate Dispatch
// Description: Connector registry and sequential dispatch executor.
// Purpose: Drive an approved approval's plan steps to terminal dispatch
// against registered connector handlers, per §4.4-4.5.
// Dependencies: approval_gate_core
// ============================================================================

//! # Approval Gate Dispatch
//!
//! [`DispatcherRegistry`] maps connector names to [`approval_gate_core::DispatchHandler`]
//! implementations and their retry policies. [`dispatch_approval`] drives one
//! approval's plan steps through that registry sequentially, classifying the
//! overall outcome and recording it back through [`approval_gate_core::ApprovalStore`].

mod executor;
mod registry;

pub mod handlers;

pub use executor::DispatchExecutorError;
pub use executor::DispatchOutcome;
pub use executor::dispatch_approval;
pub use registry::DispatcherRegistry;
