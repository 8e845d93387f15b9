mod cli;
mod host;

use std::path::Path;
use std::process::ExitCode;

use tickbridge_config::BridgeConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn init_logging(directive: &str) {
    let filter = EnvFilter::from_default_env();
    let filter = match directive.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(e) => {
            eprintln!("invalid log directive {directive:?} ({e}), using info");
            filter.add_directive(LevelFilter::INFO.into())
        }
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let args = cli::parse();

    // The log level may come from the config file, so load before the
    // subscriber exists and report the result afterwards.
    let loaded = match args.config.as_deref() {
        Some(path) => tickbridge_config::load_config_from(Path::new(path)),
        None => tickbridge_config::load_config(),
    };
    let level = loaded
        .as_ref()
        .map(|config| config.logging.level)
        .unwrap_or_default();
    let directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("tickbridge={}", level.as_directive()));
    init_logging(&directive);

    tracing::info!("tickbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        BridgeConfig::default()
    });
    if args.all_per_tick {
        config.dispatch.one_callback_per_tick = false;
    }
    tracing::info!(
        one_callback_per_tick = config.dispatch.one_callback_per_tick,
        batch_limit = config.dispatch.batch_limit,
        pump = config.pump.enabled,
        "Config loaded"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to build runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(host::run(args.feature, &config, args.ticks)) {
        Ok(summary) => {
            if args.json {
                println!("{}", summary.to_json());
            } else {
                print!("{summary}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Bridge failed: {e}");
            ExitCode::FAILURE
        }
    };
    tracing::info!("Shutdown complete");
    code
}
