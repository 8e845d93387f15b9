//! C ABI through which native code reports state changes.
//!
//! Every family shares one wire shape: a 4-byte-packed struct holding an
//! `int32` callback type followed by a union of a failure record and the
//! family's state record. Native code calls the family's entry point with the
//! owner token it received from `create`; the entry point forwards to the
//! process-wide [`CallbackEntry`] installed by the host.

use std::ffi::c_void;
use std::sync::OnceLock;

use tickbridge_common::{CallbackEnvelope, OwnerToken, SurfaceHandle};
use tickbridge_core::{CallbackEntry, Delivery};
use tracing::warn;

use crate::capture::{CameraPose, CaptureEvent, CaptureFrame};
use crate::pdf::{PdfEvent, PdfPage};
use crate::video::{MediaInfo, VideoEvent};

pub const CALLBACK_NONE: i32 = 0;
pub const CALLBACK_FAILED: i32 = 1;
/// The family's own state record. Each library only ever reports its own.
pub const CALLBACK_STATE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RawStateError {
    #[error("unknown callback type {0}")]
    UnknownCallbackType(i32),

    #[error("unknown state type {0}")]
    UnknownStateType(i32),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliverError {
    #[error("callback entry point not installed")]
    NotInstalled,

    #[error("null owner token")]
    NullToken,

    #[error(transparent)]
    Malformed(#[from] RawStateError),
}

/// A family's `#[repr(C)]` state record.
pub trait RawState: Copy {
    type Event;

    fn to_event(&self) -> Result<Self::Event, RawStateError>;
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFailedState {
    pub hresult: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union RawCallbackValue<T: Copy> {
    pub failed: RawFailedState,
    pub state: T,
}

#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub struct RawCallbackState<T: Copy> {
    pub kind: i32,
    pub value: RawCallbackValue<T>,
}

impl<T: Copy> RawCallbackState<T> {
    pub fn failed(hresult: i32) -> Self {
        Self {
            kind: CALLBACK_FAILED,
            value: RawCallbackValue {
                failed: RawFailedState { hresult },
            },
        }
    }

    pub fn state(state: T) -> Self {
        Self {
            kind: CALLBACK_STATE,
            value: RawCallbackValue { state },
        }
    }
}

impl<T: RawState> RawCallbackState<T> {
    pub fn into_envelope(self) -> Result<CallbackEnvelope<T::Event>, RawStateError> {
        let kind = self.kind;
        let value = self.value;
        match kind {
            // SAFETY: the tag names the union member native code wrote.
            CALLBACK_FAILED => Ok(CallbackEnvelope::failure(unsafe { value.failed }.hresult)),
            // SAFETY: as above. State records are plain integers, floats and
            // pointers, valid for any bit pattern.
            CALLBACK_STATE => unsafe { value.state }
                .to_event()
                .map(CallbackEnvelope::StateEvent),
            other => Err(RawStateError::UnknownCallbackType(other)),
        }
    }
}

/// Convert and forward one native callback.
pub fn deliver<T: RawState>(
    entry: Option<&CallbackEntry<T::Event>>,
    token: u64,
    state: RawCallbackState<T>,
) -> Result<Delivery, DeliverError> {
    let entry = entry.ok_or(DeliverError::NotInstalled)?;
    if token == 0 {
        return Err(DeliverError::NullToken);
    }
    let envelope = state.into_envelope()?;
    Ok(entry.invoke(OwnerToken::from_raw(token), envelope))
}

fn report(family: &'static str, result: Result<Delivery, DeliverError>) {
    if let Err(e) = result {
        warn!(family, error = %e, "native callback dropped");
    }
}

fn surface(ptr: *mut c_void) -> SurfaceHandle {
    SurfaceHandle(ptr as usize)
}

// =============================================================================
// Capture
// =============================================================================

pub mod capture_state {
    pub const NONE: i32 = 0;
    pub const PREVIEW_STARTED: i32 = 1;
    pub const PREVIEW_STOPPED: i32 = 2;
    pub const PREVIEW_AUDIO_FRAME: i32 = 3;
    pub const PREVIEW_VIDEO_FRAME: i32 = 4;
    pub const PHOTO_FRAME: i32 = 5;
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawCaptureState {
    pub state_type: i32,
    pub width: i32,
    pub height: i32,
    pub texture: *mut c_void,
    pub world: [f32; 16],
    pub projection: [f32; 16],
}

impl RawCaptureState {
    fn frame(&self) -> CaptureFrame {
        CaptureFrame {
            width: self.width,
            height: self.height,
            surface: surface(self.texture),
            pose: CameraPose {
                world: self.world,
                projection: self.projection,
            },
        }
    }
}

impl RawState for RawCaptureState {
    type Event = CaptureEvent;

    fn to_event(&self) -> Result<CaptureEvent, RawStateError> {
        use capture_state::*;
        match self.state_type {
            PREVIEW_STARTED => Ok(CaptureEvent::PreviewStarted),
            PREVIEW_STOPPED => Ok(CaptureEvent::PreviewStopped),
            PREVIEW_AUDIO_FRAME => Ok(CaptureEvent::PreviewAudioFrame),
            PREVIEW_VIDEO_FRAME => Ok(CaptureEvent::PreviewVideoFrame(self.frame())),
            PHOTO_FRAME => Ok(CaptureEvent::PhotoFrame(self.frame())),
            other => Err(RawStateError::UnknownStateType(other)),
        }
    }
}

static CAPTURE_ENTRY: OnceLock<CallbackEntry<CaptureEvent>> = OnceLock::new();

/// Install the capture callback entry. Returns `false` if one already is.
pub fn install_capture_entry(entry: CallbackEntry<CaptureEvent>) -> bool {
    CAPTURE_ENTRY.set(entry).is_ok()
}

pub fn capture_entry() -> Option<&'static CallbackEntry<CaptureEvent>> {
    CAPTURE_ENTRY.get()
}

#[no_mangle]
pub extern "C" fn tickbridge_capture_state_changed(
    token: u64,
    state: RawCallbackState<RawCaptureState>,
) {
    report("capture", deliver(CAPTURE_ENTRY.get(), token, state));
}

// =============================================================================
// PDF
// =============================================================================

pub mod pdf_state {
    pub const LOADING: i32 = 0;
    pub const LOADED: i32 = 1;
    pub const OPENED: i32 = 2;
    pub const SELECTED: i32 = 3;
}

/// On `OPENED`, `page` carries the page count.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawPdfState {
    pub state_type: i32,
    pub page: u32,
    pub width: i32,
    pub height: i32,
    pub texture: *mut c_void,
}

impl RawState for RawPdfState {
    type Event = PdfEvent;

    fn to_event(&self) -> Result<PdfEvent, RawStateError> {
        use pdf_state::*;
        match self.state_type {
            LOADING => Ok(PdfEvent::Loading),
            LOADED => Ok(PdfEvent::Loaded),
            OPENED => Ok(PdfEvent::Opened {
                page_count: self.page,
            }),
            SELECTED => Ok(PdfEvent::Selected(PdfPage {
                index: self.page,
                width: self.width,
                height: self.height,
                surface: surface(self.texture),
            })),
            other => Err(RawStateError::UnknownStateType(other)),
        }
    }
}

static PDF_ENTRY: OnceLock<CallbackEntry<PdfEvent>> = OnceLock::new();

pub fn install_pdf_entry(entry: CallbackEntry<PdfEvent>) -> bool {
    PDF_ENTRY.set(entry).is_ok()
}

pub fn pdf_entry() -> Option<&'static CallbackEntry<PdfEvent>> {
    PDF_ENTRY.get()
}

#[no_mangle]
pub extern "C" fn tickbridge_pdf_state_changed(token: u64, state: RawCallbackState<RawPdfState>) {
    report("pdf", deliver(PDF_ENTRY.get(), token, state));
}

// =============================================================================
// Media player
// =============================================================================

pub mod playback_state {
    pub const NONE: i32 = 0;
    pub const OPENING: i32 = 1;
    pub const BUFFERING: i32 = 2;
    pub const PLAYING: i32 = 3;
    pub const PAUSED: i32 = 4;
    pub const OPENED: i32 = 5;
    pub const ENDED: i32 = 6;
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawPlaybackState {
    pub state: i32,
    pub width: i32,
    pub height: i32,
    pub can_seek: u8,
    /// 100-nanosecond units.
    pub duration: i64,
}

impl RawState for RawPlaybackState {
    type Event = VideoEvent;

    fn to_event(&self) -> Result<VideoEvent, RawStateError> {
        use playback_state::*;
        match self.state {
            NONE => Ok(VideoEvent::Stopped),
            OPENING => Ok(VideoEvent::Opening),
            BUFFERING => Ok(VideoEvent::Buffering),
            PLAYING => Ok(VideoEvent::Playing),
            PAUSED => Ok(VideoEvent::Paused),
            OPENED => Ok(VideoEvent::Opened(MediaInfo {
                width: self.width,
                height: self.height,
                can_seek: self.can_seek != 0,
                duration_ticks: self.duration,
            })),
            ENDED => Ok(VideoEvent::Ended),
            other => Err(RawStateError::UnknownStateType(other)),
        }
    }
}

static VIDEO_ENTRY: OnceLock<CallbackEntry<VideoEvent>> = OnceLock::new();

pub fn install_video_entry(entry: CallbackEntry<VideoEvent>) -> bool {
    VIDEO_ENTRY.set(entry).is_ok()
}

pub fn video_entry() -> Option<&'static CallbackEntry<VideoEvent>> {
    VIDEO_ENTRY.get()
}

#[no_mangle]
pub extern "C" fn tickbridge_video_state_changed(
    token: u64,
    state: RawCallbackState<RawPlaybackState>,
) {
    report("video", deliver(VIDEO_ENTRY.get(), token, state));
}
