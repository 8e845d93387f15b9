//! System configuration types: loopback native module and logging.

use serde::{Deserialize, Serialize};

/// Settings for the thread-backed loopback native module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackSection {
    /// Delay before a reply is delivered from the worker thread (0-5000 ms).
    pub reply_delay_ms: u32,
    /// First instance id handed out by `create`.
    pub instance_start: i32,
}

impl Default for LoopbackSection {
    fn default() -> Self {
        Self {
            reply_delay_ms: 2,
            instance_start: 0x0bae,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Level name as understood by an `EnvFilter` directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}
