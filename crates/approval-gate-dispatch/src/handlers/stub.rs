// crates/approval-gate-dispatch/src/handlers/stub.rs
// ============================================================================
// Module: Stub Dispatch Handler
// Description: In-memory DispatchHandler recording every call it receives.
// Purpose: Exercise the dispatch executor's retry, skip, and dry-run
// behavior without a real connector; reusable by downstream crates' tests.
// Dependencies: approval_gate_core
// ============================================================================

//! ## Overview
//! [`StubHandler`] lets a test script queue a fixed sequence of outcomes and
//! records every [`DispatchContext`] it was invoked with, so assertions can
//! check both the resulting [`StepResult`]s and the call count.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use approval_gate_core::ConnectorName;
use approval_gate_core::DispatchContext;
use approval_gate_core::DispatchError;
use approval_gate_core::DispatchHandler;
use approval_gate_core::PlanStep;
use approval_gate_core::StepResult;
use approval_gate_core::StepResultStatus;
use approval_gate_core::Timestamp;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// One scripted outcome for a single [`StubHandler::dispatch`] call.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    /// Return a `Dispatched` result.
    Dispatched,
    /// Return a `Failed` [`StepResult`] (not an `Err`).
    FailedResult,
    /// Return `Err(DispatchError::HandlerFailure(..))`.
    Throws,
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Scripted in-memory dispatch handler for tests.
///
/// # Invariants
/// - Outcomes are consumed in order; once exhausted, further calls repeat
///   the last scripted outcome.
pub struct StubHandler {
    /// Connector name this handler answers to.
    name: ConnectorName,
    /// Remaining scripted outcomes, consumed front-to-back.
    outcomes: Mutex<Vec<StubOutcome>>,
    /// Every call's recorded attempt number, in call order.
    calls: Mutex<Vec<u32>>,
}

impl StubHandler {
    /// Builds a handler that scripts `outcomes` for successive calls.
    #[must_use]
    pub fn new(name: impl Into<ConnectorName>, outcomes: Vec<StubOutcome>) -> Self {
        Self {
            name: name.into(),
            outcomes: Mutex::new(outcomes),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of `dispatch` calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        #[allow(clippy::unwrap_used, reason = "Test-only helper; a poisoned lock is a bug.")]
        self.calls.lock().unwrap().len()
    }
}

impl DispatchHandler for StubHandler {
    fn connector_name(&self) -> ConnectorName {
        self.name.clone()
    }

    fn dispatch(
        &self,
        step: &PlanStep,
        _context: &DispatchContext,
    ) -> Result<StepResult, DispatchError> {
        let mut outcomes = self.outcomes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut calls = self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let attempt = u32::try_from(calls.len()).unwrap_or(0) + 1;
        calls.push(attempt);

        let outcome = if outcomes.len() > 1 {
            outcomes.remove(0)
        } else {
            outcomes.first().cloned().unwrap_or(StubOutcome::Dispatched)
        };

        match outcome {
            StubOutcome::Dispatched => Ok(StepResult {
                step_id: step.step_id.clone(),
                connector: self.name.clone(),
                status: StepResultStatus::Dispatched,
                result: None,
                error: None,
                completed_at: Timestamp::now(),
            }),
            StubOutcome::FailedResult => Ok(StepResult {
                step_id: step.step_id.clone(),
                connector: self.name.clone(),
                status: StepResultStatus::Failed,
                result: None,
                error: Some("stub handler scripted failure".to_string()),
                completed_at: Timestamp::now(),
            }),
            StubOutcome::Throws => Err(DispatchError::HandlerFailure(
                "stub handler scripted throw".to_string(),
            )),
        }
    }
}
