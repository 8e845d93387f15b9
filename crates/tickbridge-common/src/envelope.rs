//! Values that cross the native-to-host boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result code returned by native entry points. Zero means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeCode(pub i32);

impl NativeCode {
    pub const SUCCESS: Self = Self(0);
    /// Generic failure, used when a native id or argument is invalid.
    pub const INVALID_ARG: Self = Self(0x8007_0057_u32 as i32);
    pub const NOT_FOUND: Self = Self(0x8007_0490_u32 as i32);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0 as u32)
    }
}

/// Opaque pointer to a native surface or texture.
///
/// The bridge never dereferences it. A consumer must wrap it before the next
/// native call that may invalidate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SurfaceHandle(pub usize);

impl SurfaceHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// One native-to-host notification.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackEnvelope<E> {
    /// The native component reported a fault.
    Failure { code: NativeCode },
    /// A feature-specific state change.
    StateEvent(E),
}

impl<E> CallbackEnvelope<E> {
    pub fn failure(code: i32) -> Self {
        Self::Failure {
            code: NativeCode(code),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn map<F, T>(self, f: F) -> CallbackEnvelope<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            Self::Failure { code } => CallbackEnvelope::Failure { code },
            Self::StateEvent(event) => CallbackEnvelope::StateEvent(f(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_code_success() {
        assert!(NativeCode::SUCCESS.is_success());
        assert!(!NativeCode(1).is_success());
        assert!(!NativeCode::INVALID_ARG.is_success());
    }

    #[test]
    fn native_code_display_is_hex() {
        assert_eq!(NativeCode(0).to_string(), "0x0");
        assert_eq!(NativeCode::INVALID_ARG.to_string(), "0x80070057");
    }

    #[test]
    fn surface_handle_null() {
        assert!(SurfaceHandle::NULL.is_null());
        assert!(SurfaceHandle::default().is_null());
        assert!(!SurfaceHandle(0x1000).is_null());
    }

    #[test]
    fn envelope_map_keeps_failure() {
        let env: CallbackEnvelope<u8> = CallbackEnvelope::failure(3);
        let mapped = env.map(u32::from);
        assert_eq!(
            mapped,
            CallbackEnvelope::Failure {
                code: NativeCode(3)
            }
        );
        assert!(mapped.is_failure());
    }

    #[test]
    fn envelope_map_transforms_state() {
        let env = CallbackEnvelope::StateEvent(2u8);
        assert_eq!(env.map(|v| v * 2), CallbackEnvelope::StateEvent(4u8));
    }
}
