//! Host struct, the component seam and the per-tick step.

use std::collections::VecDeque;
use std::fmt;
use std::task::{Context, Poll};

use futures_util::task::noop_waker_ref;
use futures_util::FutureExt;
use tickbridge_common::Result;
use tickbridge_core::{NativeBridgeHandle, NativeModule, NotificationHandler, OperationFuture};
use tickbridge_plugins::{
    CameraCapture, CaptureCommand, CaptureEvent, CaptureFrames, MediaPlayer, PdfCommand,
    PdfDocument, PdfEvent, PdfPages, PlaybackStatus, VideoCommand, VideoEvent,
};
use tracing::{debug, info, warn};

use super::script::ScriptStep;
use super::types::{Outcome, OutcomeKind};

pub(super) type EventOf<C> = <<C as Component>::Module as NativeModule>::Event;

// =============================================================================
// COMPONENT SEAM
// =============================================================================

/// A feature wrapper the host can drive: it exposes its bridge and a
/// one-line description of its steady state.
pub trait Component {
    type Module: NativeModule;
    type Handler: NotificationHandler<<Self::Module as NativeModule>::Event>;

    fn bridge(&self) -> &NativeBridgeHandle<Self::Module, Self::Handler>;

    fn bridge_mut(&mut self) -> &mut NativeBridgeHandle<Self::Module, Self::Handler>;

    /// Execute this tick's callbacks.
    fn tick(&mut self) -> usize {
        self.bridge_mut().tick()
    }

    fn describe(&self) -> String;
}

impl<N> Component for CameraCapture<N>
where
    N: NativeModule<Event = CaptureEvent, Command = CaptureCommand>,
{
    type Module = N;
    type Handler = CaptureFrames;

    fn bridge(&self) -> &NativeBridgeHandle<N, CaptureFrames> {
        CameraCapture::bridge(self)
    }

    fn bridge_mut(&mut self) -> &mut NativeBridgeHandle<N, CaptureFrames> {
        CameraCapture::bridge_mut(self)
    }

    fn describe(&self) -> String {
        let frames = self.frames();
        let size = frames
            .size()
            .map_or_else(|| "none".to_string(), |(w, h)| format!("{w}x{h}"));
        format!(
            "previewing={} video_frames={} audio_frames={} failures={} size={size}",
            frames.is_previewing(),
            frames.video_frames(),
            frames.audio_frames(),
            frames.failures(),
        )
    }
}

impl<N> Component for PdfDocument<N>
where
    N: NativeModule<Event = PdfEvent, Command = PdfCommand>,
{
    type Module = N;
    type Handler = PdfPages;

    fn bridge(&self) -> &NativeBridgeHandle<N, PdfPages> {
        PdfDocument::bridge(self)
    }

    fn bridge_mut(&mut self) -> &mut NativeBridgeHandle<N, PdfPages> {
        PdfDocument::bridge_mut(self)
    }

    fn tick(&mut self) -> usize {
        PdfDocument::tick(self)
    }

    fn describe(&self) -> String {
        let pages = self.pages();
        let count = pages
            .page_count()
            .map_or_else(|| "none".to_string(), |c| c.to_string());
        let current = pages
            .current_index()
            .map_or_else(|| "none".to_string(), |i| i.to_string());
        format!("pages={count} current={current}")
    }
}

impl<N> Component for MediaPlayer<N>
where
    N: NativeModule<Event = VideoEvent, Command = VideoCommand>,
{
    type Module = N;
    type Handler = PlaybackStatus;

    fn bridge(&self) -> &NativeBridgeHandle<N, PlaybackStatus> {
        MediaPlayer::bridge(self)
    }

    fn bridge_mut(&mut self) -> &mut NativeBridgeHandle<N, PlaybackStatus> {
        MediaPlayer::bridge_mut(self)
    }

    fn describe(&self) -> String {
        let status = self.status();
        let state = status
            .state()
            .map_or_else(|| "none".to_string(), |s| format!("{s:?}"));
        let media = status.media().map_or_else(
            || "none".to_string(),
            |m| format!("{}x{} {:.1}s", m.width, m.height, m.duration().as_secs_f64()),
        );
        format!(
            "state={state} media={media} transitions={}",
            status.transitions()
        )
    }
}

// =============================================================================
// HOST
// =============================================================================

pub(super) struct InFlight<E> {
    pub(super) label: &'static str,
    pub(super) issued_at: u64,
    pub(super) future: OperationFuture<E>,
}

/// Drives one active component from a fixed script.
pub struct Host<C: Component> {
    pub(super) component: C,
    pub(super) script: VecDeque<ScriptStep<C>>,
    pub(super) in_flight: Vec<InFlight<EventOf<C>>>,
    pub(super) outcomes: Vec<Outcome>,
    pub(super) tick: u64,
    pub(super) shut_down: bool,
}

impl<C: Component> Host<C> {
    /// Activate the component's bridge and queue its script.
    pub fn start(mut component: C, mut script: Vec<ScriptStep<C>>) -> Result<Self> {
        component.bridge_mut().activate()?;
        script.sort_by_key(|step| step.at_tick);
        info!(
            steps = script.len(),
            instance_id = %component.bridge().instance_id(),
            "host started"
        );
        Ok(Self {
            component,
            script: script.into(),
            in_flight: Vec::new(),
            outcomes: Vec::new(),
            tick: 0,
            shut_down: false,
        })
    }

    /// Run one host tick: issue due script steps, execute queued callbacks,
    /// observe settled operations, then pump the native side.
    ///
    /// Returns the number of callbacks executed.
    pub fn step(&mut self) -> usize {
        if self.shut_down {
            return 0;
        }
        self.tick += 1;
        self.issue_due();
        let delivered = self.component.tick();
        self.poll_in_flight();
        self.component.bridge_mut().end_of_tick();
        delivered
    }

    fn issue_due(&mut self) {
        while self
            .script
            .front()
            .is_some_and(|step| step.at_tick <= self.tick)
        {
            let Some(step) = self.script.pop_front() else {
                break;
            };
            match (step.action)(&mut self.component) {
                Some(future) => {
                    debug!(label = step.label, tick = self.tick, "operation issued");
                    self.in_flight.push(InFlight {
                        label: step.label,
                        issued_at: self.tick,
                        future,
                    });
                }
                None => {
                    debug!(label = step.label, tick = self.tick, "step skipped");
                    self.outcomes.push(Outcome {
                        label: step.label,
                        issued_at: self.tick,
                        settled_at: self.tick,
                        kind: OutcomeKind::Skipped,
                    });
                }
            }
        }
    }

    /// Poll every in-flight operation once; settled ones become outcomes.
    pub(super) fn poll_in_flight(&mut self) {
        let mut cx = Context::from_waker(noop_waker_ref());
        let tick = self.tick;
        let mut still_pending = Vec::with_capacity(self.in_flight.len());
        for mut op in self.in_flight.drain(..) {
            match op.future.poll_unpin(&mut cx) {
                Poll::Pending => still_pending.push(op),
                Poll::Ready(result) => {
                    let kind = OutcomeKind::from_result(result);
                    log_outcome(op.label, tick, &kind);
                    self.outcomes.push(Outcome {
                        label: op.label,
                        issued_at: op.issued_at,
                        settled_at: tick,
                        kind,
                    });
                }
            }
        }
        self.in_flight = still_pending;
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// True once every script step has been issued and settled.
    pub fn is_idle(&self) -> bool {
        self.script.is_empty() && self.in_flight.is_empty()
    }
}

fn log_outcome(label: &str, tick: u64, kind: &OutcomeKind) {
    match kind {
        OutcomeKind::Completed { event } => info!(label, tick, event = %event, "operation completed"),
        OutcomeKind::Failed { error, retry } => {
            warn!(label, tick, error = %error, retry, "operation failed")
        }
        OutcomeKind::Cancelled => info!(label, tick, "operation cancelled"),
        OutcomeKind::Skipped | OutcomeKind::Abandoned => {}
    }
}

impl<C: Component> fmt::Debug for Host<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("tick", &self.tick)
            .field("queued_steps", &self.script.len())
            .field("in_flight", &self.in_flight.len())
            .field("outcomes", &self.outcomes.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
