// crates/approval-gate-config/src/model.rs
// ============================================================================
// Module: Config Model
// Description: Typed shape of approval-gate.toml, deserializable with
// defaults for every field so an empty file is a valid minimal config.
// Purpose: Give every crate one shared, validated view of service config.
// Dependencies: serde
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Top-level service configuration, loaded from `approval-gate.toml`.
///
/// # Invariants
/// - Every field has a default, so `toml::from_str("")` yields a usable
///   (if not yet [`validate`](ServiceConfig::validate)d) value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// JWT verification settings for inbound bearer tokens.
    pub jwt: JwtConfig,
    /// Cross-origin request policy.
    pub cors: CorsConfig,
    /// Directory holding the durable SQLite store and its WAL files.
    pub data_dir: PathBuf,
    /// HTTP transport and request-handling limits.
    pub server: ServerConfig,
    /// Opaque per-connector configuration blobs, keyed by connector name.
    pub connectors: BTreeMap<String, serde_json::Value>,
    /// Metrics scrape endpoint settings.
    pub metrics: MetricsConfig,
    /// Content-Security-Policy override settings.
    pub csp: CspConfig,
    /// Background sweep task settings.
    pub background: BackgroundConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            cors: CorsConfig::default(),
            data_dir: PathBuf::from("./data"),
            server: ServerConfig::default(),
            connectors: BTreeMap::new(),
            metrics: MetricsConfig::default(),
            csp: CspConfig::default(),
            background: BackgroundConfig::default(),
        }
    }
}

/// JWT verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Verification secret or PEM-encoded public key.
    pub secret: String,
    /// Expected `iss` claim, when present.
    pub issuer: Option<String>,
    /// Expected `aud` claim, when present.
    pub audience: Option<String>,
    /// Clock-skew leeway applied to `exp`/`nbf` checks.
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: None,
            audience: None,
            leeway_secs: 60,
        }
    }
}

/// Cross-origin request policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Bounded list of trusted parent origins allowed to call the API.
    pub trusted_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            trusted_origins: Vec::new(),
        }
    }
}

/// HTTP transport and request-handling limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub bind: String,
    /// Maximum accepted request body size, in bytes.
    pub max_body_bytes: u64,
    /// Concurrency and rate-limit settings.
    pub limits: ServerLimitsConfig,
    /// Optional TLS termination settings.
    pub tls: Option<ServerTlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_body_bytes: 1_048_576,
            limits: ServerLimitsConfig::default(),
            tls: None,
        }
    }
}

/// Concurrency and rate-limit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerLimitsConfig {
    /// Maximum number of requests handled concurrently.
    pub max_inflight: u32,
    /// Optional per-principal rate limit.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ServerLimitsConfig {
    fn default() -> Self {
        Self {
            max_inflight: 256,
            rate_limit: None,
        }
    }
}

/// A sliding-window rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests allowed within `window_ms`.
    pub max_requests: u32,
    /// Window length, in milliseconds.
    pub window_ms: u64,
    /// Maximum number of distinct principals tracked at once.
    pub max_entries: u32,
}

/// TLS termination settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTlsConfig {
    /// Path to the PEM-encoded certificate chain.
    pub cert_path: String,
    /// Path to the PEM-encoded private key.
    pub key_path: String,
    /// Path to a client CA bundle, required for mTLS.
    pub client_ca_path: Option<String>,
    /// Whether client certificates are required.
    pub require_client_cert: bool,
}

/// Metrics scrape endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Optional bearer token required to scrape `/metrics`.
    pub scrape_token: Option<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            scrape_token: None,
        }
    }
}

/// Content-Security-Policy override settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CspConfig {
    /// Raw `Content-Security-Policy` header value, replacing the default.
    pub overrides: Option<String>,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            overrides: None,
        }
    }
}

/// Background sweep task settings (§ expire_pending / prune_expired).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Interval between `expire_pending`/`prune_expired` sweeps, in seconds.
    pub sweep_interval_secs: u64,
    /// Time-to-live applied to idempotency entries before pruning, in seconds.
    pub idempotency_ttl_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
            idempotency_ttl_secs: 86_400,
        }
    }
}
