use std::path::PathBuf;

use crate::envelope::NativeCode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Lifecycle faults of a bridge handle.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge is already active")]
    AlreadyActive,

    #[error("bridge has been disposed")]
    Disposed,

    #[error("native create failed: {code}")]
    CreateFailed { code: NativeCode },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Terminal failure of a single correlated operation.
///
/// Callers branch on [`OperationError::should_retry`]: native failures may be
/// retried, a cancellation means the request was superseded or torn down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("native command rejected immediately: {code}")]
    ImmediateCommandFailure { code: NativeCode },

    #[error("native component reported failure: {code}")]
    AsyncFailure { code: NativeCode },

    #[error("operation cancelled")]
    Cancelled,

    #[error("bridge is not active")]
    Inactive,
}

impl OperationError {
    pub fn should_retry(&self) -> bool {
        matches!(
            self,
            Self::ImmediateCommandFailure { .. } | Self::AsyncFailure { .. }
        )
    }

    /// The native result code carried by this error, if any.
    pub fn code(&self) -> Option<NativeCode> {
        match self {
            Self::ImmediateCommandFailure { code } | Self::AsyncFailure { code } => Some(*code),
            Self::Cancelled | Self::Inactive => None,
        }
    }
}

/// Error raised by a host-side notification handler.
#[derive(Debug, thiserror::Error)]
#[error("handler error: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("pump.tick_interval_ms".into());
        assert_eq!(
            err.to_string(),
            "config validation error: pump.tick_interval_ms"
        );
    }

    #[test]
    fn bridge_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: BridgeError = config_err.into();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn bridge_error_display() {
        assert_eq!(BridgeError::Disposed.to_string(), "bridge has been disposed");
        assert_eq!(
            BridgeError::CreateFailed {
                code: NativeCode(-2147467259)
            }
            .to_string(),
            "native create failed: 0x80004005"
        );
    }

    #[test]
    fn retry_classification() {
        let code = NativeCode(5);
        assert!(OperationError::ImmediateCommandFailure { code }.should_retry());
        assert!(OperationError::AsyncFailure { code }.should_retry());
        assert!(!OperationError::Cancelled.should_retry());
        assert!(!OperationError::Inactive.should_retry());
    }

    #[test]
    fn operation_error_code() {
        let code = NativeCode(7);
        assert_eq!(OperationError::AsyncFailure { code }.code(), Some(code));
        assert_eq!(OperationError::Cancelled.code(), None);
    }

    #[test]
    fn handler_error_display() {
        let err = HandlerError::new("texture missing");
        assert_eq!(err.to_string(), "handler error: texture missing");
    }
}
