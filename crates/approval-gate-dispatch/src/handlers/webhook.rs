// crates/approval-gate-dispatch/src/handlers/webhook.rs
// ============================================================================
// Module: Webhook Dispatch Handler
// Description: DispatchHandler that POSTs a plan step's payload to a fixed
// webhook endpoint over blocking HTTP.
// Purpose: Give operators a zero-config connector for the common case of
// notifying an external system that an approval cleared.
// Dependencies: approval_gate_core, reqwest
// ============================================================================

//! ## Overview
//! [`WebhookHandler`] dispatches by POSTing `step.plan` as the request body
//! to a configured URL and mapping the response status to a [`StepResult`].
//! `dry_run` suppresses the network call entirely so approval flows can be
//! exercised end-to-end without mutating the receiving system.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use approval_gate_core::ConnectorName;
use approval_gate_core::DispatchContext;
use approval_gate_core::DispatchError;
use approval_gate_core::DispatchHandler;
use approval_gate_core::HandlerHealth;
use approval_gate_core::PlanStep;
use approval_gate_core::StepResult;
use approval_gate_core::StepResultStatus;
use approval_gate_core::Timestamp;
use reqwest::blocking::Client;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`WebhookHandler`].
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Connector name this handler answers to in the registry.
    pub connector_name: ConnectorName,
    /// Destination URL every dispatched step is POSTed to.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Dispatches plan steps by POSTing their payload to a fixed webhook URL.
///
/// # Invariants
/// - Never performs network I/O when [`DispatchContext::dry_run`] is `true`.
pub struct WebhookHandler {
    /// Handler configuration.
    config: WebhookConfig,
    /// Blocking HTTP client reused across dispatch calls.
    client: Client,
}

impl WebhookHandler {
    /// Builds a new webhook handler.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: WebhookConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        Ok(Self { config, client })
    }
}

impl DispatchHandler for WebhookHandler {
    fn connector_name(&self) -> ConnectorName {
        self.config.connector_name.clone()
    }

    fn dispatch(
        &self,
        step: &PlanStep,
        context: &DispatchContext,
    ) -> Result<StepResult, DispatchError> {
        if context.dry_run {
            return Ok(StepResult {
                step_id: step.step_id.clone(),
                connector: self.connector_name(),
                status: StepResultStatus::Dispatched,
                result: Some(serde_json::json!({"dry_run": true})),
                error: None,
                completed_at: Timestamp::now(),
            });
        }

        let payload = serde_json::to_vec(&step.plan)
            .map_err(|err| DispatchError::HandlerFailure(err.to_string()))?;
        let response = self
            .client
            .post(&self.config.url)
            .header("content-type", "application/json")
            .body(payload)
            .send()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::HandlerFailure(format!(
                "webhook responded with status {status}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        Ok(StepResult {
            step_id: step.step_id.clone(),
            connector: self.connector_name(),
            status: StepResultStatus::Dispatched,
            result: Some(body),
            error: None,
            completed_at: Timestamp::now(),
        })
    }

    fn health_check(&self) -> Result<HandlerHealth, DispatchError> {
        Ok(HandlerHealth {
            healthy: true,
            detail: None,
        })
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

    use std::thread;

    use approval_gate_core::ApprovalId;
    use approval_gate_core::OperatorId;
    use approval_gate_core::PlanStep;
    use approval_gate_core::RequestId;
    use tiny_http::Response;
    use tiny_http::Server;

    use super::*;

    fn sample_step() -> PlanStep {
        PlanStep::new(
            "step-1",
            "notify billing",
            "webhook",
            serde_json::json!({"invoice_id": "inv-1"}),
        )
    }

    fn sample_context(dry_run: bool) -> DispatchContext {
        DispatchContext {
            approval_id: ApprovalId::from("appr-1"),
            request_id: RequestId::from("req-1"),
            operator_id: OperatorId::from("op-1"),
            dry_run,
        }
    }

    #[test]
    fn dry_run_never_touches_the_network() {
        let handler = WebhookHandler::new(WebhookConfig {
            connector_name: ConnectorName::from("webhook"),
            url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let result = handler.dispatch(&sample_step(), &sample_context(true)).unwrap();
        assert_eq!(result.status, StepResultStatus::Dispatched);
    }

    #[test]
    fn success_response_is_dispatched_with_body() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let url = format!("http://{addr}");

        let handle = thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = Response::from_string(r#"{"ok":true}"#);
                let _ = request.respond(response);
            }
        });

        let handler = WebhookHandler::new(WebhookConfig {
            connector_name: ConnectorName::from("webhook"),
            url,
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let result = handler.dispatch(&sample_step(), &sample_context(false)).unwrap();
        assert_eq!(result.status, StepResultStatus::Dispatched);
        assert_eq!(result.result, Some(serde_json::json!({"ok": true})));
        handle.join().unwrap();
    }

    #[test]
    fn non_success_status_is_a_handler_failure() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let url = format!("http://{addr}");

        let handle = thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = Response::from_string("server error")
                    .with_status_code(tiny_http::StatusCode(500));
                let _ = request.respond(response);
            }
        });

        let handler = WebhookHandler::new(WebhookConfig {
            connector_name: ConnectorName::from("webhook"),
            url,
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = handler
            .dispatch(&sample_step(), &sample_context(false))
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerFailure(_)));
        handle.join().unwrap();
    }
}
