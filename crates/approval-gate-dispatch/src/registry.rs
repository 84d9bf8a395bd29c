// crates/approval-gate-dispatch/src/registry.rs
// ============================================================================
// Module: Dispatcher Registry
// Description: In-memory connector-name to handler routing table.
// Purpose: Let the dispatch executor resolve a plan step's connector to a
// handler and an effective retry policy without backend-specific wiring.
// Dependencies: approval_gate_core
// ============================================================================

//! ## Overview
//! The registry is read-mostly after startup: [`DispatcherRegistry::register`]
//! is expected to run only during boot, while [`DispatcherRegistry::get`] and
//! [`DispatcherRegistry::get_retry_policy`] are called once per plan step on
//! every dispatch request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use approval_gate_core::ConnectorName;
use approval_gate_core::DispatchHandler;
use approval_gate_core::RetryPolicy;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// One connector's registered handler plus its optional retry override.
struct Registration {
    /// The connector-specific dispatch handler.
    handler: Arc<dyn DispatchHandler>,
    /// Retry policy override; falls back to [`RetryPolicy::DEFAULT`] when unset.
    policy: Option<RetryPolicy>,
}

/// Routes plan steps to connector handlers by connector name.
///
/// # Invariants
/// - Registering a connector name a second time replaces the prior handler
///   and policy; there is no boot-time uniqueness check.
#[derive(Default)]
pub struct DispatcherRegistry {
    /// Registered handlers keyed by connector name.
    handlers: BTreeMap<ConnectorName, Registration>,
}

impl DispatcherRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registers a handler for its own [`DispatchHandler::connector_name`],
    /// with an optional per-connector retry override.
    pub fn register(&mut self, handler: Arc<dyn DispatchHandler>, policy: Option<RetryPolicy>) {
        let name = handler.connector_name();
        self.handlers.insert(name, Registration { handler, policy });
    }

    /// Returns the handler registered for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &ConnectorName) -> Option<Arc<dyn DispatchHandler>> {
        self.handlers.get(name).map(|reg| Arc::clone(&reg.handler))
    }

    /// Returns `true` when a handler is registered for `name`.
    #[must_use]
    pub fn has(&self, name: &ConnectorName) -> bool {
        self.handlers.contains_key(name)
    }

    /// Lists every registered connector name, in registration-key order.
    #[must_use]
    pub fn list_registered(&self) -> Vec<ConnectorName> {
        self.handlers.keys().cloned().collect()
    }

    /// Returns the effective retry policy for `name`: the connector's own
    /// override if one was registered, else [`RetryPolicy::DEFAULT`].
    #[must_use]
    pub fn get_retry_policy(&self, name: &ConnectorName) -> RetryPolicy {
        self.handlers
            .get(name)
            .and_then(|reg| reg.policy)
            .unwrap_or(RetryPolicy::DEFAULT)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::sync::Arc;

    use approval_gate_core::ConnectorName;
    use approval_gate_core::DispatchContext;
    use approval_gate_core::DispatchError;
    use approval_gate_core::DispatchHandler;
    use approval_gate_core::PlanStep;
    use approval_gate_core::RetryPolicy;
    use approval_gate_core::StepResult;
    use approval_gate_core::StepResultStatus;
    use approval_gate_core::Timestamp;

    use super::DispatcherRegistry;

    struct StubHandler {
        name: &'static str,
    }

    impl DispatchHandler for StubHandler {
        fn connector_name(&self) -> ConnectorName {
            ConnectorName::from(self.name)
        }

        fn dispatch(
            &self,
            step: &PlanStep,
            _context: &DispatchContext,
        ) -> Result<StepResult, DispatchError> {
            Ok(StepResult {
                step_id: step.step_id.clone(),
                connector: self.connector_name(),
                status: StepResultStatus::Dispatched,
                result: None,
                error: None,
                completed_at: Timestamp::now(),
            })
        }
    }

    #[test]
    fn unregistered_connector_is_absent() {
        let registry = DispatcherRegistry::new();
        let name = ConnectorName::from("webhook");
        assert!(!registry.has(&name));
        assert!(registry.get(&name).is_none());
        assert_eq!(registry.get_retry_policy(&name), RetryPolicy::DEFAULT);
    }

    #[test]
    fn registered_connector_is_resolved_with_its_policy() {
        let mut registry = DispatcherRegistry::new();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 50,
        };
        registry.register(Arc::new(StubHandler { name: "webhook" }), Some(policy));

        let name = ConnectorName::from("webhook");
        assert!(registry.has(&name));
        assert!(registry.get(&name).is_some());
        assert_eq!(registry.get_retry_policy(&name), policy);
        assert_eq!(registry.list_registered(), vec![name]);
    }

    #[test]
    fn re_registering_a_connector_replaces_its_policy() {
        let mut registry = DispatcherRegistry::new();
        registry.register(Arc::new(StubHandler { name: "webhook" }), None);
        let name = ConnectorName::from("webhook");
        assert_eq!(registry.get_retry_policy(&name), RetryPolicy::DEFAULT);

        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 10,
        };
        registry.register(Arc::new(StubHandler { name: "webhook" }), Some(policy));
        assert_eq!(registry.get_retry_policy(&name), policy);
        assert_eq!(registry.list_registered().len(), 1);
    }
}
