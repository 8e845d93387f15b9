use super::*;
use crate::schema::BridgeConfig;

#[test]
fn default_config_is_valid() {
    assert!(validate(&BridgeConfig::default()).is_ok());
}

#[test]
fn zero_tick_interval_is_rejected() {
    let mut config = BridgeConfig::default();
    config.pump.tick_interval_ms = 0;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("pump.tick_interval_ms"));
}

#[test]
fn oversized_batch_limit_is_rejected() {
    let mut config = BridgeConfig::default();
    config.dispatch.batch_limit = MAX_BATCH_LIMIT + 1;
    assert!(validate(&config).is_err());
}

#[test]
fn instance_start_below_sentinel_is_rejected() {
    let mut config = BridgeConfig::default();
    config.loopback.instance_start = 0x0bad;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("loopback.instance_start"));
}

#[test]
fn all_errors_are_collected() {
    let mut config = BridgeConfig::default();
    config.pump.tick_interval_ms = 5000;
    config.loopback.reply_delay_ms = 10_000;
    let msg = validate(&config).unwrap_err().to_string();
    assert!(msg.contains("pump.tick_interval_ms"));
    assert!(msg.contains("loopback.reply_delay_ms"));
    assert!(msg.contains("; "));
}
