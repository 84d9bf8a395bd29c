// crates/approval-gate-config/src/lib.rs
// ============================================================================
// Module: Approval Gate Config
// Description: Typed, validated service configuration for the approval gate.
// Purpose: One shared config model every crate that needs startup settings
// (JWT, CORS, data directory, connectors, metrics, CSP) loads and validates
// through, instead of reading ad-hoc environment variables.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! # Approval Gate Config
//!
//! [`ServiceConfig`] is deserialized from `approval-gate.toml` via
//! [`ServiceConfig::load`], which applies environment-variable overrides and
//! then [`ServiceConfig::validate`]s the result. [`config_schema`],
//! [`config_toml_example`], and [`config_docs_markdown`] keep a JSON Schema,
//! a worked example, and rendered docs in lockstep with the model.

mod artifacts;
mod error;
mod load;
mod model;
mod validate;

pub use artifacts::config_docs_markdown;
pub use artifacts::config_schema;
pub use artifacts::config_toml_example;
pub use error::ConfigError;
pub use model::BackgroundConfig;
pub use model::CorsConfig;
pub use model::CspConfig;
pub use model::JwtConfig;
pub use model::MetricsConfig;
pub use model::RateLimitConfig;
pub use model::ServerConfig;
pub use model::ServerLimitsConfig;
pub use model::ServerTlsConfig;
pub use model::ServiceConfig;
