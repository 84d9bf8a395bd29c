// crates/approval-gate-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Error taxonomy for config loading, parsing, and validation.
// Purpose: Give callers a typed, fail-closed surface instead of panics.
// ============================================================================

/// Errors produced while loading or validating a [`crate::ServiceConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file path exceeds the maximum allowed length.
    #[error("config path exceeds max length")]
    PathTooLong,
    /// A single path component exceeds the maximum allowed length.
    #[error("config path component too long")]
    PathComponentTooLong,
    /// The config file on disk exceeds the maximum allowed size.
    #[error("config file exceeds size limit")]
    FileTooLarge,
    /// The config file is not valid UTF-8.
    #[error("config file must be utf-8")]
    NotUtf8,
    /// The config file could not be read from disk.
    #[error("failed to read config file: {0}")]
    Io(String),
    /// The config file's TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// A parsed config failed semantic validation.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// The config JSON schema could not be rendered.
    #[error("failed to render config schema: {0}")]
    Schema(String),
}
