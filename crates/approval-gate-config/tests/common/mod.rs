//! Shared fixtures for approval-gate-config's validation test suites.
#![allow(unsafe_code, reason = "Test-only process env mutation for override tests.")]

use approval_gate_config::ConfigError;
use approval_gate_config::ServiceConfig;

/// Builds a config that passes [`ServiceConfig::validate`] as-is, so each
/// test can mutate exactly the field it wants to exercise.
pub fn minimal_config() -> Result<ServiceConfig, ConfigError> {
    let mut config = ServiceConfig::default();
    config.jwt.secret = "test-only-secret".to_string();
    config.data_dir = "./data".into();
    config.server.bind = "127.0.0.1:8080".to_string();
    config.validate()?;
    Ok(config)
}

/// Sets an environment variable for the current process.
pub fn set_var(key: &str, value: &str) {
    // SAFETY: this test binary is single-threaded at the point env override
    // tests run and restores the variable before returning.
    unsafe {
        std::env::set_var(key, value);
    }
}

/// Removes an environment variable from the current process.
pub fn remove_var(key: &str) {
    // SAFETY: see `set_var` above.
    unsafe {
        std::env::remove_var(key);
    }
}
