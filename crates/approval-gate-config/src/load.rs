// crates/approval-gate-config/src/load.rs
// ============================================================================
// Module: Config Loading
// Description: Reads approval-gate.toml from disk, applies environment
// overrides, and validates the result.
// Purpose: One fail-closed entry point every binary and CLI command uses.
// Dependencies: toml
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use crate::ConfigError;
use crate::ServiceConfig;

/// Maximum accepted length of a config file path, in bytes.
const MAX_CONFIG_PATH_BYTES: usize = 4_096;
/// Maximum accepted length of a single path component, in bytes.
const MAX_PATH_COMPONENT_BYTES: usize = 255;
/// Maximum accepted size of the config file itself, in bytes.
const MAX_CONFIG_FILE_BYTES: usize = 1_048_576;

impl ServiceConfig {
    /// Loads config from `path`, falling back to defaults when `path` is
    /// `None`, applies environment overrides, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the path is malformed, the file cannot be
    /// read or is too large, the content is not UTF-8 or not valid TOML, or
    /// the parsed config fails [`ServiceConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the config file at `path`, without validating it.
    fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        validate_config_path(path)?;
        let bytes = std::fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_BYTES {
            return Err(ConfigError::FileTooLarge);
        }
        let text = String::from_utf8(bytes).map_err(|_err| ConfigError::NotUtf8)?;
        toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Overlays values from the process environment onto this config.
    ///
    /// Environment variables win over whatever the TOML file supplied,
    /// matching the precedence the teacher's providers use for overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("APPROVAL_GATE_JWT_SECRET") {
            self.jwt.secret = secret;
        }
        if let Ok(dir) = std::env::var("APPROVAL_GATE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(bind) = std::env::var("APPROVAL_GATE_BIND") {
            self.server.bind = bind;
        }
        if let Ok(token) = std::env::var("APPROVAL_GATE_METRICS_SCRAPE_TOKEN") {
            self.metrics.scrape_token = Some(token);
        }
    }
}

/// Guards against pathological config paths before touching the filesystem.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_CONFIG_PATH_BYTES {
        return Err(ConfigError::PathTooLong);
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_BYTES {
            return Err(ConfigError::PathComponentTooLong);
        }
    }
    Ok(())
}
