//! Camera capture: preview streaming and still photos.

use std::sync::{Arc, Mutex};

use tickbridge_common::{CallbackEnvelope, HandlerError, NativeCode, Result, SurfaceHandle};
use tickbridge_config::schema::LoopbackSection;
use tickbridge_core::{
    CallbackEntry, DispatchConfig, LoopbackModule, NativeBridgeHandle, NativeModule,
    NotificationHandler, OperationFuture, PluginCommand, PluginEvent, Reply,
};
use tracing::{debug, info, trace, warn};

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    Start,
    Stop,
    Snapshot,
}

/// Camera-to-world and projection matrices, column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub world: [f32; 16],
    pub projection: [f32; 16],
}

impl CameraPose {
    pub const IDENTITY: Self = Self {
        world: IDENTITY_MATRIX,
        projection: IDENTITY_MATRIX,
    };
}

const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureFrame {
    pub width: i32,
    pub height: i32,
    pub surface: SurfaceHandle,
    pub pose: CameraPose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    PreviewStarted,
    PreviewStopped,
    PreviewAudioFrame,
    PreviewVideoFrame(CaptureFrame),
    PhotoFrame(CaptureFrame),
}

impl PluginEvent for CaptureEvent {
    type Kind = CaptureKind;

    fn completes(&self) -> Option<CaptureKind> {
        match self {
            Self::PreviewStarted => Some(CaptureKind::Start),
            Self::PreviewStopped => Some(CaptureKind::Stop),
            Self::PhotoFrame(_) => Some(CaptureKind::Snapshot),
            Self::PreviewAudioFrame | Self::PreviewVideoFrame(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSettings {
    pub width: u32,
    pub height: u32,
    pub enable_audio: bool,
    /// Mixed-reality capture: composite holograms into the stream.
    pub enable_mrc: bool,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            enable_audio: false,
            enable_mrc: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureCommand {
    StartPreview(PreviewSettings),
    StopPreview,
    TakePhoto {
        width: u32,
        height: u32,
        enable_mrc: bool,
    },
}

impl PluginCommand for CaptureCommand {
    type Kind = CaptureKind;

    fn kind(&self) -> CaptureKind {
        match self {
            Self::StartPreview(_) => CaptureKind::Start,
            Self::StopPreview => CaptureKind::Stop,
            Self::TakePhoto { .. } => CaptureKind::Snapshot,
        }
    }
}

/// Tracks the preview stream between operations.
#[derive(Debug, Default)]
pub struct CaptureFrames {
    previewing: bool,
    latest: Option<CaptureFrame>,
    video_frames: u64,
    audio_frames: u64,
    failures: u64,
}

impl CaptureFrames {
    pub fn is_previewing(&self) -> bool {
        self.previewing
    }

    pub fn latest(&self) -> Option<&CaptureFrame> {
        self.latest.as_ref()
    }

    /// `(width, height)` of the current preview surface.
    pub fn size(&self) -> Option<(i32, i32)> {
        self.latest.map(|f| (f.width, f.height))
    }

    pub fn video_frames(&self) -> u64 {
        self.video_frames
    }

    pub fn audio_frames(&self) -> u64 {
        self.audio_frames
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn on_video_frame(&mut self, frame: CaptureFrame) -> std::result::Result<(), HandlerError> {
        if frame.surface.is_null() || frame.width <= 0 || frame.height <= 0 {
            return Err(HandlerError::new(format!(
                "unusable preview frame {}x{}",
                frame.width, frame.height
            )));
        }
        if self.size() != Some((frame.width, frame.height)) {
            info!(width = frame.width, height = frame.height, "preview size changed");
        }
        self.latest = Some(frame);
        self.video_frames += 1;
        Ok(())
    }
}

impl NotificationHandler<CaptureEvent> for CaptureFrames {
    fn observe(&mut self, event: &CaptureEvent) {
        match event {
            CaptureEvent::PreviewStarted => self.previewing = true,
            CaptureEvent::PreviewStopped => {
                self.previewing = false;
                self.latest = None;
            }
            _ => {}
        }
    }

    fn on_notification(&mut self, event: CaptureEvent) -> std::result::Result<(), HandlerError> {
        match event {
            CaptureEvent::PreviewVideoFrame(frame) => self.on_video_frame(frame),
            CaptureEvent::PreviewAudioFrame => {
                self.audio_frames += 1;
                trace!("preview audio frame");
                Ok(())
            }
            other => {
                debug!(event = ?other, "unexpected capture notification");
                Ok(())
            }
        }
    }

    fn on_failure(&mut self, code: NativeCode) {
        self.failures += 1;
        self.previewing = false;
        warn!(%code, "capture pipeline failed");
    }
}

/// Camera capture component bound to one native instance.
pub struct CameraCapture<N>
where
    N: NativeModule<Event = CaptureEvent, Command = CaptureCommand>,
{
    bridge: NativeBridgeHandle<N, CaptureFrames>,
}

impl<N> CameraCapture<N>
where
    N: NativeModule<Event = CaptureEvent, Command = CaptureCommand>,
{
    pub fn new(module: Arc<N>, entry: CallbackEntry<CaptureEvent>, config: DispatchConfig) -> Self {
        Self {
            bridge: NativeBridgeHandle::new(module, entry, CaptureFrames::default(), config),
        }
    }

    pub fn activate(&mut self) -> Result<()> {
        self.bridge.activate()
    }

    pub fn start_preview(&mut self, settings: PreviewSettings) -> OperationFuture<CaptureEvent> {
        self.bridge.operation(CaptureCommand::StartPreview(settings))
    }

    pub fn stop_preview(&mut self) -> OperationFuture<CaptureEvent> {
        self.bridge.operation(CaptureCommand::StopPreview)
    }

    pub fn take_photo(
        &mut self,
        width: u32,
        height: u32,
        enable_mrc: bool,
    ) -> OperationFuture<CaptureEvent> {
        self.bridge.operation(CaptureCommand::TakePhoto {
            width,
            height,
            enable_mrc,
        })
    }

    pub fn frames(&self) -> &CaptureFrames {
        self.bridge.handler()
    }

    pub fn bridge(&self) -> &NativeBridgeHandle<N, CaptureFrames> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut NativeBridgeHandle<N, CaptureFrames> {
        &mut self.bridge
    }
}

// =============================================================================
// Loopback simulation
// =============================================================================

pub type SimulatedCapture = LoopbackModule<CaptureCommand, CaptureEvent>;

#[derive(Debug, Default)]
struct PreviewStream {
    active: Option<PreviewSettings>,
}

/// Loopback capture device. While a preview runs, every pump produces one
/// video frame at the requested size, plus an audio frame every fourth tick
/// when audio is enabled.
pub fn simulated(section: &LoopbackSection) -> SimulatedCapture {
    let stream = Arc::new(Mutex::new(PreviewStream::default()));
    let commands = Arc::clone(&stream);

    LoopbackModule::from_config(section, move |command: &CaptureCommand| match command {
        CaptureCommand::StartPreview(settings) => {
            if settings.width == 0 || settings.height == 0 {
                return Reply::reject(NativeCode::INVALID_ARG);
            }
            lock(&commands).active = Some(*settings);
            Reply::accept_one(CaptureEvent::PreviewStarted)
        }
        CaptureCommand::StopPreview => {
            lock(&commands).active = None;
            Reply::accept_one(CaptureEvent::PreviewStopped)
        }
        CaptureCommand::TakePhoto { width, height, .. } => {
            if *width == 0 || *height == 0 {
                return Reply::reject(NativeCode::INVALID_ARG);
            }
            Reply::accept_one(CaptureEvent::PhotoFrame(CaptureFrame {
                width: *width as i32,
                height: *height as i32,
                surface: SurfaceHandle(0xf000),
                pose: CameraPose::IDENTITY,
            }))
        }
    })
    .with_pump_source(move |token| {
        let Some(settings) = lock(&stream).active else {
            return Vec::new();
        };
        let mut envelopes = vec![CallbackEnvelope::StateEvent(CaptureEvent::PreviewVideoFrame(
            CaptureFrame {
                width: settings.width as i32,
                height: settings.height as i32,
                surface: SurfaceHandle(0x1000 + token.sequence() as usize),
                pose: CameraPose::IDENTITY,
            },
        ))];
        if settings.enable_audio && token.sequence() % 4 == 0 {
            envelopes.push(CallbackEnvelope::StateEvent(CaptureEvent::PreviewAudioFrame));
        }
        envelopes
    })
}
