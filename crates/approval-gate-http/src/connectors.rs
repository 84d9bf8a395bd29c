// crates/approval-gate-http/src/connectors.rs
// ============================================================================
// Module: Connector Registry Wiring
// Description: Builds a DispatcherRegistry from the opaque per-connector
// JSON blobs in ServiceConfig.
// Purpose: Translate `[connectors.*]` config entries into registered
// DispatchHandler implementations at startup.
// Dependencies: approval_gate_dispatch, approval_gate_core, serde
// ============================================================================

//! ## Overview
//! Every entry in `ServiceConfig::connectors` is a `{kind, ...}` JSON blob.
//! The only connector kind shipped with this engine is `"webhook"`; other
//! kinds are rejected at startup rather than silently ignored, so a typo in
//! `approval-gate.toml` fails fast instead of leaving a plan step
//! unroutable at dispatch time.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use approval_gate_core::ConnectorName;
use approval_gate_core::RetryPolicy;
use approval_gate_dispatch::DispatcherRegistry;
use approval_gate_dispatch::handlers::WebhookConfig;
use approval_gate_dispatch::handlers::WebhookHandler;

/// Errors building the registry from connector config.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorConfigError {
    /// An entry's shape did not match its declared kind, including an
    /// unrecognized `kind` tag.
    #[error("connector {0}: {1}")]
    Malformed(String, String),
    /// The handler itself failed to construct (e.g. bad HTTP client config).
    #[error("connector {0}: {1}")]
    HandlerInit(String, String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ConnectorEntry {
    Webhook {
        url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default)]
        retry: Option<RetryEntry>,
    },
}

#[derive(Debug, Deserialize)]
struct RetryEntry {
    max_attempts: u32,
    #[serde(default)]
    base_delay_ms: u64,
}

const fn default_timeout_ms() -> u64 {
    10_000
}

/// Builds a [`DispatcherRegistry`] from `connectors`, registering one
/// handler per entry under its map key as the connector name.
///
/// # Errors
///
/// Returns [`ConnectorConfigError`] when an entry names an unsupported
/// `kind`, is malformed, or its handler fails to construct.
pub fn build_registry(
    connectors: &std::collections::BTreeMap<String, serde_json::Value>,
) -> Result<DispatcherRegistry, ConnectorConfigError> {
    let mut registry = DispatcherRegistry::new();
    for (name, raw) in connectors {
        let entry: ConnectorEntry = serde_json::from_value(raw.clone())
            .map_err(|err| ConnectorConfigError::Malformed(name.clone(), err.to_string()))?;
        match entry {
            ConnectorEntry::Webhook {
                url,
                timeout_ms,
                retry,
            } => {
                let config = WebhookConfig {
                    connector_name: ConnectorName::new(name.clone()),
                    url,
                    timeout: Duration::from_millis(timeout_ms),
                };
                let handler = WebhookHandler::new(config)
                    .map_err(|err| ConnectorConfigError::HandlerInit(name.clone(), err.to_string()))?;
                let policy = retry.map(|retry| RetryPolicy {
                    max_attempts: retry.max_attempts,
                    base_delay_ms: retry.base_delay_ms,
                });
                registry.register(Arc::new(handler), policy);
            }
        }
    }
    Ok(registry)
}
