//! Media player: open content, play, pause and stop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tickbridge_common::{CallbackEnvelope, HandlerError, NativeCode, Result};
use tickbridge_config::schema::LoopbackSection;
use tickbridge_core::{
    CallbackEntry, DispatchConfig, LoopbackModule, NativeBridgeHandle, NativeModule,
    NotificationHandler, OperationFuture, PluginCommand, PluginEvent, Reply,
};
use tracing::{info, warn};

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoKind {
    Load,
    Play,
    Pause,
    Stop,
}

/// Properties of opened content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo {
    pub width: i32,
    pub height: i32,
    pub can_seek: bool,
    /// Natural duration in 100-nanosecond units.
    pub duration_ticks: i64,
}

impl MediaInfo {
    pub fn duration(&self) -> Duration {
        Duration::from_nanos((self.duration_ticks.max(0) as u64).saturating_mul(100))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    Stopped,
    Opening,
    Buffering,
    Playing,
    Paused,
    Opened(MediaInfo),
    Ended,
}

impl PluginEvent for VideoEvent {
    type Kind = VideoKind;

    fn completes(&self) -> Option<VideoKind> {
        match self {
            Self::Opened(_) => Some(VideoKind::Load),
            Self::Playing => Some(VideoKind::Play),
            Self::Paused => Some(VideoKind::Pause),
            Self::Stopped => Some(VideoKind::Stop),
            Self::Opening | Self::Buffering | Self::Ended => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoCommand {
    LoadContent { location: String },
    Play,
    Pause,
    Stop,
}

impl PluginCommand for VideoCommand {
    type Kind = VideoKind;

    fn kind(&self) -> VideoKind {
        match self {
            Self::LoadContent { .. } => VideoKind::Load,
            Self::Play => VideoKind::Play,
            Self::Pause => VideoKind::Pause,
            Self::Stop => VideoKind::Stop,
        }
    }
}

/// Last reported player state.
#[derive(Debug, Default)]
pub struct PlaybackStatus {
    state: Option<VideoEvent>,
    media: Option<MediaInfo>,
    transitions: u64,
}

impl PlaybackStatus {
    pub fn state(&self) -> Option<VideoEvent> {
        self.state
    }

    pub fn media(&self) -> Option<&MediaInfo> {
        self.media.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state == Some(VideoEvent::Playing)
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}

impl NotificationHandler<VideoEvent> for PlaybackStatus {
    fn observe(&mut self, event: &VideoEvent) {
        if let VideoEvent::Opened(info) = event {
            self.media = Some(*info);
        }
        if self.state != Some(*event) {
            info!(state = ?event, "playback state");
            self.transitions += 1;
        }
        self.state = Some(*event);
    }

    fn on_notification(&mut self, _event: VideoEvent) -> std::result::Result<(), HandlerError> {
        Ok(())
    }

    fn on_failure(&mut self, code: NativeCode) {
        warn!(%code, "playback failed");
        self.state = None;
    }
}

/// Media player component bound to one native instance.
pub struct MediaPlayer<N>
where
    N: NativeModule<Event = VideoEvent, Command = VideoCommand>,
{
    bridge: NativeBridgeHandle<N, PlaybackStatus>,
}

impl<N> MediaPlayer<N>
where
    N: NativeModule<Event = VideoEvent, Command = VideoCommand>,
{
    pub fn new(module: Arc<N>, entry: CallbackEntry<VideoEvent>, config: DispatchConfig) -> Self {
        Self {
            bridge: NativeBridgeHandle::new(module, entry, PlaybackStatus::default(), config),
        }
    }

    pub fn activate(&mut self) -> Result<()> {
        self.bridge.activate()
    }

    pub fn load(&mut self, location: impl Into<String>) -> OperationFuture<VideoEvent> {
        self.bridge.operation(VideoCommand::LoadContent {
            location: location.into(),
        })
    }

    pub fn play(&mut self) -> OperationFuture<VideoEvent> {
        self.bridge.operation(VideoCommand::Play)
    }

    pub fn pause(&mut self) -> OperationFuture<VideoEvent> {
        self.bridge.operation(VideoCommand::Pause)
    }

    pub fn stop(&mut self) -> OperationFuture<VideoEvent> {
        self.bridge.operation(VideoCommand::Stop)
    }

    pub fn status(&self) -> &PlaybackStatus {
        self.bridge.handler()
    }

    pub fn bridge(&self) -> &NativeBridgeHandle<N, PlaybackStatus> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut NativeBridgeHandle<N, PlaybackStatus> {
        &mut self.bridge
    }
}

// =============================================================================
// Loopback simulation
// =============================================================================

pub type SimulatedPlayer = LoopbackModule<VideoCommand, VideoEvent>;

/// Pump calls a simulated clip plays for before it reports `Ended`.
pub const SIMULATED_CLIP_PUMPS: u32 = 90;

#[derive(Debug, Default)]
struct Transport {
    loaded: bool,
    playing: bool,
    position: u32,
}

/// Loopback player: any non-empty location opens a 1080p clip that ends
/// after [`SIMULATED_CLIP_PUMPS`] pumps of playback.
pub fn simulated(section: &LoopbackSection) -> SimulatedPlayer {
    let transport = Arc::new(Mutex::new(Transport::default()));
    let commands = Arc::clone(&transport);

    LoopbackModule::from_config(section, move |command: &VideoCommand| {
        let mut transport = lock(&commands);
        match command {
            VideoCommand::LoadContent { location } if location.trim().is_empty() => {
                Reply::reject(NativeCode::NOT_FOUND)
            }
            VideoCommand::LoadContent { .. } => {
                *transport = Transport {
                    loaded: true,
                    ..Transport::default()
                };
                Reply::accept(vec![
                    CallbackEnvelope::StateEvent(VideoEvent::Opening),
                    CallbackEnvelope::StateEvent(VideoEvent::Buffering),
                    CallbackEnvelope::StateEvent(VideoEvent::Opened(MediaInfo {
                        width: 1920,
                        height: 1080,
                        can_seek: true,
                        duration_ticks: 30_000_000,
                    })),
                ])
            }
            _ if !transport.loaded => Reply::reject(NativeCode::INVALID_ARG),
            VideoCommand::Play => {
                transport.playing = true;
                Reply::accept_one(VideoEvent::Playing)
            }
            VideoCommand::Pause => {
                transport.playing = false;
                Reply::accept_one(VideoEvent::Paused)
            }
            VideoCommand::Stop => {
                transport.playing = false;
                transport.position = 0;
                Reply::accept_one(VideoEvent::Stopped)
            }
        }
    })
    .with_pump_source(move |_| {
        let mut transport = lock(&transport);
        if !transport.playing {
            return Vec::new();
        }
        transport.position += 1;
        if transport.position < SIMULATED_CLIP_PUMPS {
            return Vec::new();
        }
        transport.playing = false;
        transport.position = 0;
        vec![CallbackEnvelope::StateEvent(VideoEvent::Ended)]
    })
}
