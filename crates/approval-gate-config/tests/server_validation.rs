//! Server config validation tests for approval-gate-config.
// crates/approval-gate-config/tests/server_validation.rs
// =============================================================================
// Module: Server Config Validation Tests
// Description: Validate server bind, TLS, and rate-limit constraints.
// Purpose: Ensure server settings fail closed and enforce limits.
// =============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use approval_gate_config::ConfigError;
use approval_gate_config::RateLimitConfig;
use approval_gate_config::ServerLimitsConfig;
use approval_gate_config::ServerTlsConfig;

mod common;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn bind_must_be_non_empty() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.bind = String::new();
    assert_invalid(config.validate(), "server.bind must be non-empty")?;
    Ok(())
}

#[test]
fn bind_must_be_a_socket_address() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.bind = "not-a-socket-address".to_string();
    assert_invalid(config.validate(), "server.bind must be a valid socket address")?;
    Ok(())
}

#[test]
fn tls_rejects_empty_cert_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.tls = Some(ServerTlsConfig {
        cert_path: "   ".to_string(),
        key_path: "server.key".to_string(),
        client_ca_path: None,
        require_client_cert: false,
    });
    assert_invalid(config.validate(), "tls.cert_path must be non-empty")?;
    Ok(())
}

#[test]
fn tls_rejects_empty_key_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.tls = Some(ServerTlsConfig {
        cert_path: "server.pem".to_string(),
        key_path: String::new(),
        client_ca_path: None,
        require_client_cert: false,
    });
    assert_invalid(config.validate(), "tls.key_path must be non-empty")?;
    Ok(())
}

#[test]
fn tls_requires_client_ca_when_client_cert_required() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.tls = Some(ServerTlsConfig {
        cert_path: "server.pem".to_string(),
        key_path: "server.key".to_string(),
        client_ca_path: None,
        require_client_cert: true,
    });
    assert_invalid(
        config.validate(),
        "tls.client_ca_path required when require_client_cert is true",
    )?;
    Ok(())
}

#[test]
fn tls_accepts_a_complete_mtls_configuration() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.tls = Some(ServerTlsConfig {
        cert_path: "server.pem".to_string(),
        key_path: "server.key".to_string(),
        client_ca_path: Some("client-ca.pem".to_string()),
        require_client_cert: true,
    });
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn rate_limit_rejects_zero_max_requests() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.limits = ServerLimitsConfig {
        max_inflight: 1,
        rate_limit: Some(RateLimitConfig {
            max_requests: 0,
            window_ms: 1_000,
            max_entries: 100,
        }),
    };
    assert_invalid(config.validate(), "rate_limit.max_requests must be greater than zero")?;
    Ok(())
}

#[test]
fn rate_limit_rejects_sub_minimum_window() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.limits = ServerLimitsConfig {
        max_inflight: 1,
        rate_limit: Some(RateLimitConfig {
            max_requests: 10,
            window_ms: 50,
            max_entries: 100,
        }),
    };
    assert_invalid(config.validate(), "rate_limit.window_ms must be at least 100")?;
    Ok(())
}

#[test]
fn rate_limit_rejects_zero_max_entries() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.limits = ServerLimitsConfig {
        max_inflight: 1,
        rate_limit: Some(RateLimitConfig {
            max_requests: 10,
            window_ms: 1_000,
            max_entries: 0,
        }),
    };
    assert_invalid(config.validate(), "rate_limit.max_entries must be greater than zero")?;
    Ok(())
}

#[test]
fn metrics_scrape_token_rejects_whitespace() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.metrics.scrape_token = Some("bad token".to_string());
    assert_invalid(config.validate(), "metrics.scrape_token must not contain whitespace")?;
    Ok(())
}
