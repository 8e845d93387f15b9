//! Commented default config file content.

pub(super) fn default_config_toml() -> &'static str {
    r##"# Tickbridge Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[dispatch]
# one_callback_per_tick = true   # run at most one queued callback per host tick
# batch_limit = 0                # cap per tick when not throttled, 0 = unlimited (0-4096)

[pump]
# enabled = true
# tick_interval_ms = 16          # 1-1000

[loopback]
# reply_delay_ms = 2             # 0-5000
# instance_start = 3054          # 0x0bae

[logging]
# level = "INFO"                 # DEBUG, INFO, WARNING, ERROR
"##
}
