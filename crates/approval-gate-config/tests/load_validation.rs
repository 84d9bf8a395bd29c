//! Config load validation tests for approval-gate-config.
// crates/approval-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::io::Write;
use std::path::Path;

use approval_gate_config::ConfigError;
use approval_gate_config::ServiceConfig;
use tempfile::NamedTempFile;

mod common;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<ServiceConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(ServiceConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(ServiceConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(ServiceConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(ServiceConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_rejects_invalid_toml() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"not = [valid").map_err(|err| err.to_string())?;
    assert_invalid(ServiceConfig::load(Some(file.path())), "failed to parse config")?;
    Ok(())
}

#[test]
fn load_rejects_empty_jwt_secret_at_validation() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"data_dir = \"./data\"\n").map_err(|err| err.to_string())?;
    assert_invalid(ServiceConfig::load(Some(file.path())), "jwt.secret must be non-empty")?;
    Ok(())
}

#[test]
fn load_with_no_path_falls_back_to_defaults() -> TestResult {
    let err = ServiceConfig::load(None).expect_err("default config has an empty jwt.secret");
    if !err.to_string().contains("jwt.secret must be non-empty") {
        return Err(format!("unexpected error: {err}"));
    }
    Ok(())
}

#[test]
fn load_env_override_wins_over_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"jwt.secret = \"from-file\"\ndata_dir = \"./data\"\n")
        .map_err(|err| err.to_string())?;
    common::set_var("APPROVAL_GATE_JWT_SECRET", "from-env");
    let config = ServiceConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    common::remove_var("APPROVAL_GATE_JWT_SECRET");
    if config.jwt.secret != "from-env" {
        return Err(format!("expected env override, got {}", config.jwt.secret));
    }
    Ok(())
}
