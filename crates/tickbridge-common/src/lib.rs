pub mod envelope;
pub mod errors;
pub mod id;

pub use envelope::{CallbackEnvelope, NativeCode, SurfaceHandle};
pub use errors::{BridgeError, ConfigError, HandlerError, OperationError};
pub use id::{new_correlation_id, NativeInstanceId, OwnerToken, PumpToken};

pub type Result<T> = std::result::Result<T, BridgeError>;
