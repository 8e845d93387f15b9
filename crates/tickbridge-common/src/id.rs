use serde::{Deserialize, Serialize};
use std::fmt;

/// Short hex id attached to log lines of a single correlated operation.
pub fn new_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Opaque handle naming a registered owner to native code.
///
/// Encodes a slot index in the low 32 bits and the slot generation in the
/// high 32 bits. Generations start at 1, so the raw value is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerToken(u64);

impl OwnerToken {
    pub fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// Rebuild a token from the value native code handed back.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }

    pub fn index(self) -> u32 {
        self.0 as u32
    }

    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner-{}.{}", self.index(), self.generation())
    }
}

/// Handle to a native resource returned by the native `create` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeInstanceId(pub i32);

impl NativeInstanceId {
    /// Sentinel for "no instance".
    pub const INVALID: Self = Self(0x0bad);
    /// First id a native module hands out.
    pub const START: Self = Self(0x0bae);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for NativeInstanceId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for NativeInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Per-tick value passed to the native pump entry point.
///
/// High 16 bits: tick sequence number. Low 16 bits: instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PumpToken(u32);

impl PumpToken {
    pub fn pack(sequence: u16, instance: NativeInstanceId) -> Self {
        Self(((sequence as u32) << 16) | (instance.0 as u32 & 0xffff))
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Signed form, as passed through an `int32_t` parameter.
    pub fn as_i32(self) -> i32 {
        self.0 as i32
    }

    pub fn sequence(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn instance(self) -> u16 {
        self.0 as u16
    }

    /// `(sequence, instance)` as the native side reads them.
    pub fn unpack(self) -> (u16, u16) {
        (self.sequence(), self.instance())
    }
}
