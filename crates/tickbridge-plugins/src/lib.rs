//! Feature families served by the callback bridge.
//!
//! Each family supplies typed commands and events, the rules that pair
//! replies with operations, a steady-state handler, a thin wrapper over
//! [`NativeBridgeHandle`](tickbridge_core::NativeBridgeHandle) and a
//! loopback simulation. `ffi` holds the C ABI entry points native code calls.

pub mod capture;
pub mod ffi;
pub mod pdf;
pub mod video;

pub use capture::{CameraCapture, CaptureCommand, CaptureEvent, CaptureFrames, CaptureKind};
pub use pdf::{PdfCommand, PdfDocument, PdfEvent, PdfKind, PdfPages};
pub use video::{MediaPlayer, PlaybackStatus, VideoCommand, VideoEvent, VideoKind};

pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
