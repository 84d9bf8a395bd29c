// crates/approval-gate-config/src/validate.rs
// ============================================================================
// Module: Config Validation
// Description: Semantic checks over a parsed ServiceConfig.
// Purpose: Reject out-of-range or incoherent config at startup, not at the
// first request that depends on it.
// ============================================================================

use crate::ConfigError;
use crate::ServiceConfig;

/// Maximum number of trusted CORS origins accepted in one config.
const MAX_TRUSTED_ORIGINS: usize = 64;

impl ServiceConfig {
    /// Validates this config, returning the first violation found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first field that
    /// fails validation, in the order the fields are declared below.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_jwt()?;
        self.validate_cors()?;
        self.validate_data_dir()?;
        self.validate_server()?;
        self.validate_metrics()?;
        self.validate_background()?;
        Ok(())
    }

    /// Validates [`crate::JwtConfig`].
    fn validate_jwt(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(invalid("jwt.secret must be non-empty"));
        }
        Ok(())
    }

    /// Validates [`crate::CorsConfig`].
    fn validate_cors(&self) -> Result<(), ConfigError> {
        if self.cors.trusted_origins.len() > MAX_TRUSTED_ORIGINS {
            return Err(invalid("cors.trusted_origins exceeds max entries"));
        }
        for origin in &self.cors.trusted_origins {
            if origin.trim().is_empty() || origin.contains(char::is_whitespace) {
                return Err(invalid("cors.trusted_origins entry must be a bare origin"));
            }
        }
        Ok(())
    }

    /// Validates `data_dir`.
    fn validate_data_dir(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(invalid("data_dir must be non-empty"));
        }
        Ok(())
    }

    /// Validates [`crate::ServerConfig`] and its nested settings.
    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.bind.trim().is_empty() {
            return Err(invalid("server.bind must be non-empty"));
        }
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid("server.bind must be a valid socket address"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes must be greater than zero"));
        }
        if self.server.limits.max_inflight == 0 {
            return Err(invalid("server.limits.max_inflight must be greater than zero"));
        }
        if let Some(rate_limit) = &self.server.limits.rate_limit {
            if rate_limit.max_requests == 0 {
                return Err(invalid("rate_limit.max_requests must be greater than zero"));
            }
            if rate_limit.window_ms < 100 {
                return Err(invalid("rate_limit.window_ms must be at least 100"));
            }
            if rate_limit.max_entries == 0 {
                return Err(invalid("rate_limit.max_entries must be greater than zero"));
            }
        }
        if let Some(tls) = &self.server.tls {
            if tls.cert_path.trim().is_empty() {
                return Err(invalid("tls.cert_path must be non-empty"));
            }
            if tls.key_path.trim().is_empty() {
                return Err(invalid("tls.key_path must be non-empty"));
            }
            if tls.require_client_cert && tls.client_ca_path.as_deref().unwrap_or_default().trim().is_empty() {
                return Err(invalid("tls.client_ca_path required when require_client_cert is true"));
            }
        }
        Ok(())
    }

    /// Validates [`crate::MetricsConfig`].
    fn validate_metrics(&self) -> Result<(), ConfigError> {
        if let Some(token) = &self.metrics.scrape_token {
            if token.trim().is_empty() {
                return Err(invalid("metrics.scrape_token must be non-empty when set"));
            }
            if token.contains(char::is_whitespace) {
                return Err(invalid("metrics.scrape_token must not contain whitespace"));
            }
        }
        Ok(())
    }

    /// Validates [`crate::BackgroundConfig`].
    fn validate_background(&self) -> Result<(), ConfigError> {
        if self.background.sweep_interval_secs == 0 {
            return Err(invalid("background.sweep_interval_secs must be greater than zero"));
        }
        if self.background.idempotency_ttl_secs == 0 {
            return Err(invalid("background.idempotency_ttl_secs must be greater than zero"));
        }
        Ok(())
    }
}

/// Builds an [`ConfigError::Invalid`] with the given message.
fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
