//! Fixed operation scripts per feature family.

use tickbridge_core::{NativeModule, OperationFuture};
use tickbridge_plugins::capture::PreviewSettings;
use tickbridge_plugins::{
    CameraCapture, CaptureCommand, CaptureEvent, MediaPlayer, PdfCommand, PdfDocument, PdfEvent,
    VideoCommand, VideoEvent,
};

use super::core::{Component, EventOf};

/// Issues one operation, or returns `None` when there is nothing to do.
pub type Action<C> = fn(&mut C) -> Option<OperationFuture<EventOf<C>>>;

/// One operation issued on the first host tick at or after `at_tick`.
pub struct ScriptStep<C: Component> {
    pub at_tick: u64,
    pub label: &'static str,
    pub action: Action<C>,
}

impl<C: Component> ScriptStep<C> {
    pub fn new(at_tick: u64, label: &'static str, action: Action<C>) -> Self {
        Self {
            at_tick,
            label,
            action,
        }
    }
}

/// Preview, two photos (the second with an invalid size), then stop.
pub fn capture<N>() -> Vec<ScriptStep<CameraCapture<N>>>
where
    N: NativeModule<Event = CaptureEvent, Command = CaptureCommand>,
{
    vec![
        ScriptStep::new(1, "start preview", |c: &mut CameraCapture<N>| {
            Some(c.start_preview(PreviewSettings {
                enable_audio: true,
                ..PreviewSettings::default()
            }))
        }),
        ScriptStep::new(30, "take photo", |c: &mut CameraCapture<N>| {
            Some(c.take_photo(1920, 1080, false))
        }),
        ScriptStep::new(45, "take empty photo", |c: &mut CameraCapture<N>| {
            Some(c.take_photo(0, 0, false))
        }),
        ScriptStep::new(60, "stop preview", |c: &mut CameraCapture<N>| {
            Some(c.stop_preview())
        }),
    ]
}

/// Open a document and walk it, wrapping past both ends.
pub fn pdf<N>() -> Vec<ScriptStep<PdfDocument<N>>>
where
    N: NativeModule<Event = PdfEvent, Command = PdfCommand>,
{
    vec![
        ScriptStep::new(1, "load", |d: &mut PdfDocument<N>| {
            Some(d.load("documents", "manual.pdf"))
        }),
        ScriptStep::new(10, "next page", |d: &mut PdfDocument<N>| d.next_page()),
        ScriptStep::new(20, "last page", |d: &mut PdfDocument<N>| d.last_page()),
        ScriptStep::new(30, "next page (wraps)", |d: &mut PdfDocument<N>| d.next_page()),
        ScriptStep::new(40, "previous page (wraps)", |d: &mut PdfDocument<N>| {
            d.previous_page()
        }),
        ScriptStep::new(50, "last page again", |d: &mut PdfDocument<N>| d.last_page()),
        ScriptStep::new(60, "page 3", |d: &mut PdfDocument<N>| d.select_page(3)),
    ]
}

/// Load a clip, play, pause, resume, then stop before it ends.
pub fn video<N>() -> Vec<ScriptStep<MediaPlayer<N>>>
where
    N: NativeModule<Event = VideoEvent, Command = VideoCommand>,
{
    vec![
        ScriptStep::new(1, "load", |p: &mut MediaPlayer<N>| {
            Some(p.load("media/sample.mp4"))
        }),
        ScriptStep::new(8, "play", |p: &mut MediaPlayer<N>| Some(p.play())),
        ScriptStep::new(40, "pause", |p: &mut MediaPlayer<N>| Some(p.pause())),
        ScriptStep::new(50, "resume", |p: &mut MediaPlayer<N>| Some(p.play())),
        ScriptStep::new(110, "stop", |p: &mut MediaPlayer<N>| Some(p.stop())),
    ]
}
