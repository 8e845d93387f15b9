//! Tickbridge configuration.
//!
//! TOML-based settings for the dispatch pump, the host tick cadence, the
//! loopback native module and logging. Every section uses serde defaults so
//! partial files work.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tickbridge_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{BridgeConfig, CONFIG_SCHEMA_VERSION};

use tickbridge_common::ConfigError;

/// Load config from the platform default path and validate it.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit file and validate it.
pub fn load_config_from(path: &std::path::Path) -> Result<BridgeConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &BridgeConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&BridgeConfig::default());
        assert!(json.contains("\"dispatch\""));
        assert!(json.contains("\"pump\""));
        assert!(json.contains("\"loopback\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn load_config_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pump]\ntick_interval_ms = 0\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_config_from_missing_file() {
        let err = load_config_from(std::path::Path::new("/nonexistent/tickbridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = config_to_json(&BridgeConfig::default());
        let parsed: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert!(parsed.dispatch.one_callback_per_tick);
        assert_eq!(parsed.pump.tick_interval_ms, 16);
    }
}
