//! Native callback bridge.
//!
//! Lets a single-threaded host consume state notifications that a native
//! component produces on its own threads:
//! - `registry`: opaque owner tokens handed to native code
//! - `queue`: multi-producer event queue drained by one consumer
//! - `pump`: per-tick drain and native pump driver
//! - `correlator`: one in-flight operation per kind, cancel on supersede
//! - `handle`: per-owner lifecycle composing the above
//! - `loopback`: thread-backed native module for tests and demos

pub mod correlator;
pub mod handle;
pub mod loopback;
pub mod native;
pub mod pump;
pub mod queue;
pub mod registry;

pub use correlator::{OperationCorrelator, OperationFuture};
pub use handle::{BridgeState, NativeBridgeHandle};
pub use loopback::{LoopbackModule, Reply};
pub use native::{
    handler_fn, CallbackEntry, Delivery, FnHandler, NativeModule, NotificationHandler,
    PluginCommand, PluginEvent,
};
pub use pump::{DispatchConfig, DispatchPump, PumpStats};
pub use queue::{EventQueue, QueueSender};
pub use registry::HandleRegistry;

pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
