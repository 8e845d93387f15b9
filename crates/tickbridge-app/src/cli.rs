use clap::{Parser, ValueEnum};

/// Drive a native callback bridge against a loopback device.
#[derive(Parser, Debug)]
#[command(name = "tickbridge", version, about)]
pub struct Args {
    /// Feature family to run.
    #[arg(short = 'f', long, value_enum, default_value_t = Feature::Capture)]
    pub feature: Feature,

    /// Number of host ticks to run before shutting down.
    #[arg(short = 'n', long, default_value_t = 120)]
    pub ticks: u64,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Execute every queued callback each tick instead of one.
    #[arg(long)]
    pub all_per_tick: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Feature {
    Capture,
    Pdf,
    Video,
}

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Pdf => "pdf",
            Self::Video => "video",
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["tickbridge"]).unwrap();
        assert_eq!(args.feature, Feature::Capture);
        assert_eq!(args.ticks, 120);
        assert!(!args.all_per_tick);
        assert!(args.config.is_none());
    }

    #[test]
    fn feature_and_flags() {
        let args = Args::try_parse_from([
            "tickbridge",
            "--feature",
            "video",
            "-n",
            "10",
            "--all-per-tick",
            "--log-level",
            "debug",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.feature, Feature::Video);
        assert_eq!(args.ticks, 10);
        assert!(args.all_per_tick);
        assert!(args.json);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn unknown_feature_is_rejected() {
        assert!(Args::try_parse_from(["tickbridge", "--feature", "audio"]).is_err());
    }
}
