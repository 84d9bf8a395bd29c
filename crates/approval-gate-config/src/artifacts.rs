// crates/approval-gate-config/src/artifacts.rs
// ============================================================================
// Module: Config Artifacts
// Description: JSON schema, example TOML, and rendered docs for ServiceConfig.
// Purpose: Give operators a schema to validate against and a starting file,
// kept in lockstep with the model by the config_artifacts integration tests.
// Dependencies: serde_json
// ============================================================================

use crate::ConfigError;

/// Returns the JSON Schema (draft 2020-12) describing `approval-gate.toml`.
///
/// Every top-level and nested field is optional, mirroring
/// [`crate::ServiceConfig`]'s `#[serde(default)]` coverage: an empty
/// document is a schema-valid (if not yet [`crate::ServiceConfig::validate`]d)
/// config.
#[must_use]
pub fn config_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "approval-gate.toml",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "jwt": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "secret": { "type": "string" },
                    "issuer": { "type": "string" },
                    "audience": { "type": "string" },
                    "leeway_secs": { "type": "integer", "minimum": 0 }
                }
            },
            "cors": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "trusted_origins": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                }
            },
            "data_dir": { "type": "string" },
            "server": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "bind": { "type": "string" },
                    "max_body_bytes": { "type": "integer", "minimum": 1 },
                    "limits": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "max_inflight": { "type": "integer", "minimum": 1 },
                            "rate_limit": {
                                "type": "object",
                                "additionalProperties": false,
                                "properties": {
                                    "max_requests": { "type": "integer", "minimum": 1 },
                                    "window_ms": { "type": "integer", "minimum": 100 },
                                    "max_entries": { "type": "integer", "minimum": 1 }
                                },
                                "required": ["max_requests", "window_ms", "max_entries"]
                            }
                        }
                    },
                    "tls": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "cert_path": { "type": "string" },
                            "key_path": { "type": "string" },
                            "client_ca_path": { "type": "string" },
                            "require_client_cert": { "type": "boolean" }
                        },
                        "required": ["cert_path", "key_path", "require_client_cert"]
                    }
                }
            },
            "connectors": {
                "type": "object",
                "additionalProperties": true
            },
            "metrics": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scrape_token": { "type": "string" }
                }
            },
            "csp": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "overrides": { "type": "string" }
                }
            },
            "background": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "sweep_interval_secs": { "type": "integer", "minimum": 1 },
                    "idempotency_ttl_secs": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
}

/// Returns a fully populated example `approval-gate.toml`.
///
/// Every field the schema names is present here with a realistic value, so
/// the example doubles as a starting point for operators standing up a new
/// deployment.
#[must_use]
pub fn config_toml_example() -> String {
    r#"[jwt]
secret = "replace-with-a-strong-verification-secret"
issuer = "https://auth.example.com/"
audience = "approval-gate"
leeway_secs = 60

[cors]
trusted_origins = ["https://console.example.com"]

data_dir = "/var/lib/approval-gate"

[server]
bind = "0.0.0.0:8443"
max_body_bytes = 1048576

[server.limits]
max_inflight = 256

[server.limits.rate_limit]
max_requests = 120
window_ms = 60000
max_entries = 10000

[server.tls]
cert_path = "/etc/approval-gate/tls/server.pem"
key_path = "/etc/approval-gate/tls/server.key"
require_client_cert = false

[metrics]
scrape_token = "replace-with-a-scrape-token"

[csp]
overrides = "default-src 'self'"

[background]
sweep_interval_secs = 30
idempotency_ttl_secs = 86400

[connectors.webhook]
url = "https://hooks.example.com/approval-gate"
timeout_ms = 5000
"#
    .to_string()
}

/// Renders human-readable Markdown documentation for `approval-gate.toml`.
///
/// # Errors
///
/// This never actually fails for the static sections below; the `Result`
/// keeps the signature stable for a future schema-driven renderer that can.
pub fn config_docs_markdown() -> Result<String, ConfigError> {
    let mut docs = String::new();
    docs.push_str("# approval-gate.toml Configuration\n\n");
    docs.push_str(
        "This document describes every section of `approval-gate.toml`. All \
         sections are optional; an empty file loads a valid (if not startup-ready) \
         default configuration.\n\n",
    );
    docs.push_str("## `[jwt]`\n\nJWT verification settings for inbound bearer tokens. `secret` must be non-empty before the config validates.\n\n");
    docs.push_str("## `[cors]`\n\n`trusted_origins` bounds which parent origins may call the API cross-origin.\n\n");
    docs.push_str("## `data_dir`\n\nDirectory holding the durable SQLite store and its WAL files.\n\n");
    docs.push_str("## `[server]`\n\nHTTP bind address, body size cap, concurrency limits, optional rate limit, and optional TLS settings.\n\n");
    docs.push_str("## `[connectors.<name>]`\n\nOpaque per-connector configuration blobs, passed through to each connector's handler unparsed.\n\n");
    docs.push_str("## `[metrics]`\n\n`scrape_token`, when set, is required as a bearer token on `GET /metrics`.\n\n");
    docs.push_str("## `[csp]`\n\n`overrides` replaces the default `Content-Security-Policy` response header.\n\n");
    docs.push_str("## `[background]`\n\nCadence for the periodic `expire_pending`/`prune_expired` sweep and the idempotency entry TTL.\n");
    Ok(docs)
}
