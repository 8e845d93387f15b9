//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod dispatch;
mod system;

pub use dispatch::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub dispatch: DispatchSection,
    pub pump: PumpSection,
    pub loopback: LoopbackSection,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dispatch_is_throttled() {
        let config = BridgeConfig::default();
        assert!(config.dispatch.one_callback_per_tick);
        assert_eq!(config.dispatch.batch_limit, 0);
    }

    #[test]
    fn default_pump() {
        let config = BridgeConfig::default();
        assert!(config.pump.enabled);
        assert_eq!(config.pump.tick_interval_ms, 16);
    }

    #[test]
    fn default_loopback() {
        let config = BridgeConfig::default();
        assert_eq!(config.loopback.reply_delay_ms, 2);
        assert_eq!(config.loopback.instance_start, 0x0bae);
    }

    #[test]
    fn default_logging() {
        assert_eq!(BridgeConfig::default().logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
[dispatch]
batch_limit = 8
"#,
        )
        .unwrap();
        assert_eq!(config.dispatch.batch_limit, 8);
        assert!(config.dispatch.one_callback_per_tick);
        assert!(config.pump.enabled);
    }

    #[test]
    fn empty_toml_is_default() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.pump.tick_interval_ms, 16);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn log_level_parses_uppercase() {
        let config: BridgeConfig = toml::from_str(
            r#"
[logging]
level = "DEBUG"
"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.level.as_directive(), "debug");
    }
}
