//! Boundary validation tests for approval-gate-config.
// crates/approval-gate-config/tests/boundary_validation.rs
// =============================================================================
// Module: Boundary Validation Tests
// Description: Exercise min/max boundaries on numeric and collection fields.
// Purpose: Ensure every numeric and size boundary is tested at its edge.
// =============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use approval_gate_config::ConfigError;
use approval_gate_config::RateLimitConfig;

mod common;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

// ============================================================================
// SECTION: Min/Max Boundary Testing
// ============================================================================

#[test]
fn max_body_bytes_at_minimum_1() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 1;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn max_body_bytes_at_zero_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "server.max_body_bytes must be greater than zero")?;
    Ok(())
}

#[test]
fn max_inflight_at_minimum_1() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.limits.max_inflight = 1;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn max_inflight_at_zero_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.limits.max_inflight = 0;
    assert_invalid(config.validate(), "server.limits.max_inflight must be greater than zero")?;
    Ok(())
}

#[test]
fn rate_limit_window_ms_at_min_100() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.limits.rate_limit = Some(RateLimitConfig {
        max_requests: 10,
        window_ms: 100,
        max_entries: 10,
    });
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn rate_limit_window_ms_below_100_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.limits.rate_limit = Some(RateLimitConfig {
        max_requests: 10,
        window_ms: 99,
        max_entries: 10,
    });
    assert_invalid(config.validate(), "rate_limit.window_ms must be at least 100")?;
    Ok(())
}

#[test]
fn cors_trusted_origins_at_max_64() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cors.trusted_origins =
        (0..64).map(|i| format!("https://origin-{i}.example.com")).collect();
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn cors_trusted_origins_above_64_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cors.trusted_origins =
        (0..65).map(|i| format!("https://origin-{i}.example.com")).collect();
    assert_invalid(config.validate(), "cors.trusted_origins exceeds max entries")?;
    Ok(())
}

#[test]
fn cors_trusted_origins_rejects_blank_entry() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cors.trusted_origins = vec!["   ".to_string()];
    assert_invalid(config.validate(), "cors.trusted_origins entry must be a bare origin")?;
    Ok(())
}

#[test]
fn data_dir_rejects_empty_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.data_dir = String::new().into();
    assert_invalid(config.validate(), "data_dir must be non-empty")?;
    Ok(())
}

#[test]
fn background_sweep_interval_at_zero_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.background.sweep_interval_secs = 0;
    assert_invalid(config.validate(), "background.sweep_interval_secs must be greater than zero")?;
    Ok(())
}

#[test]
fn background_idempotency_ttl_at_zero_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.background.idempotency_ttl_secs = 0;
    assert_invalid(
        config.validate(),
        "background.idempotency_ttl_secs must be greater than zero",
    )?;
    Ok(())
}
