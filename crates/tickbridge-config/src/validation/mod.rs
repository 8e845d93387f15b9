//! Full configuration validation.
//!
//! Validates all numeric ranges and collects every violation into a single
//! `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::BridgeConfig;
use tickbridge_common::ConfigError;

use helpers::check_range;

/// Largest per-tick batch a config may ask for.
pub const MAX_BATCH_LIMIT: u32 = 4096;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &BridgeConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    check_range(&mut errors, "dispatch.batch_limit", config.dispatch.batch_limit, 0..=MAX_BATCH_LIMIT);
    check_range(&mut errors, "pump.tick_interval_ms", config.pump.tick_interval_ms, 1..=1000);
    check_range(&mut errors, "loopback.reply_delay_ms", config.loopback.reply_delay_ms, 0..=5000);
    // Instance ids travel in the low 16 bits of the pump token.
    check_range(
        &mut errors,
        "loopback.instance_start",
        config.loopback.instance_start,
        0x0bae..=0xfff0,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
