//! Reading and parsing config files.

use std::path::Path;

use tickbridge_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::BridgeConfig;
use crate::validation;

/// Parse TOML text. Missing sections and fields take their defaults.
pub fn parse_toml(content: &str) -> Result<BridgeConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load a config file.
///
/// Range violations are logged and the parsed config is still returned;
/// callers that need a valid config run [`validation::validate`] themselves.
pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    let config = parse_toml(&content).map_err(|e| match e {
        ConfigError::ParseError(msg) => ConfigError::ParseError(format!("{}: {msg}", path.display())),
        other => other,
    })?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "config out of range, using as-is: {e}");
    }
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load from [`default_config_path`], writing the commented default file
/// on first run.
pub fn load_default() -> Result<BridgeConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "no config file, using defaults");
            create_default_config(&path)?;
            Ok(BridgeConfig::default())
        }
        result => result,
    }
}
