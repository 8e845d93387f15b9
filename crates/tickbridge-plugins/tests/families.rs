//! PDF and media player wrappers driven tick by tick against their loopback
//! simulations.

use std::sync::Arc;

use futures_util::FutureExt;
use tickbridge_common::{NativeCode, OperationError};
use tickbridge_config::schema::LoopbackSection;
use tickbridge_core::{
    CallbackEntry, DispatchConfig, LoopbackModule, NativeBridgeHandle, NativeModule,
    NotificationHandler, OperationFuture, PluginEvent,
};
use tickbridge_plugins::pdf::{self, SimulatedPdf, SIMULATED_PAGE_COUNT};
use tickbridge_plugins::video::{self, SimulatedPlayer, SIMULATED_CLIP_PUMPS};
use tickbridge_plugins::{MediaPlayer, PdfDocument, PdfEvent, VideoEvent};

fn immediate() -> LoopbackSection {
    LoopbackSection {
        reply_delay_ms: 0,
        ..LoopbackSection::default()
    }
}

fn unthrottled() -> DispatchConfig {
    DispatchConfig {
        one_callback_per_tick: false,
        ..DispatchConfig::default()
    }
}

fn poll_twice<T>(future: &mut OperationFuture<T>) -> Option<Result<T, OperationError>> {
    (&mut *future)
        .now_or_never()
        .or_else(|| (&mut *future).now_or_never())
}

/// Wait for the loopback worker threads, then tick until the queue is empty.
fn settle<C, E, H>(bridge: &mut NativeBridgeHandle<LoopbackModule<C, E>, H>)
where
    LoopbackModule<C, E>: NativeModule<Event = E>,
    E: PluginEvent,
    H: NotificationHandler<E>,
{
    bridge.module().settle();
    while bridge.tick() > 0 {}
}

// =============================================================================
// PDF
// =============================================================================

fn document() -> PdfDocument<SimulatedPdf> {
    let module = Arc::new(pdf::simulated(&immediate()));
    let mut doc = PdfDocument::new(module, CallbackEntry::new(), unthrottled());
    doc.activate().unwrap();
    doc
}

fn select(
    doc: &mut PdfDocument<SimulatedPdf>,
    future: Option<OperationFuture<PdfEvent>>,
) -> Option<u32> {
    let mut future = future?;
    settle(doc.bridge_mut());
    match poll_twice(&mut future) {
        Some(Ok(PdfEvent::Selected(page))) => Some(page.index),
        other => panic!("unexpected selection result: {other:?}"),
    }
}

#[test]
fn pdf_load_reports_progress_then_resolves() {
    let mut doc = document();
    let mut load = doc.load("docs", "manual.pdf");
    settle(doc.bridge_mut());

    assert_eq!(
        poll_twice(&mut load),
        Some(Ok(PdfEvent::Opened {
            page_count: SIMULATED_PAGE_COUNT
        }))
    );
    assert_eq!(doc.pages().page_count(), Some(SIMULATED_PAGE_COUNT));
    assert!(!doc.pages().is_loading());
    assert_eq!(doc.bridge().stats().delivered, 3);
}

#[test]
fn pdf_missing_file_fails_immediately() {
    let mut doc = document();
    let mut load = doc.load("docs", "  ");
    assert_eq!(
        poll_twice(&mut load),
        Some(Err(OperationError::ImmediateCommandFailure {
            code: NativeCode::NOT_FOUND
        }))
    );
}

#[test]
fn pdf_navigation_wraps() {
    let mut doc = document();
    assert!(doc.first_page().is_none());

    let mut load = doc.load("docs", "manual.pdf");
    settle(doc.bridge_mut());
    assert!(poll_twice(&mut load).unwrap().is_ok());

    let first = doc.first_page();
    assert_eq!(select(&mut doc, first), Some(0));
    assert!(doc.first_page().is_none(), "already on the first page");

    let previous = doc.previous_page();
    assert_eq!(select(&mut doc, previous), Some(SIMULATED_PAGE_COUNT - 1));

    let next = doc.next_page();
    assert_eq!(select(&mut doc, next), Some(0));

    let next = doc.next_page();
    assert_eq!(select(&mut doc, next), Some(1));

    let last = doc.last_page();
    assert_eq!(select(&mut doc, last), Some(SIMULATED_PAGE_COUNT - 1));
    assert_eq!(doc.pages().current_index(), Some(SIMULATED_PAGE_COUNT - 1));
}

#[test]
fn opened_document_shows_its_first_page() {
    let mut doc = document();
    let mut load = doc.load("docs", "manual.pdf");
    doc.bridge().module().settle();
    while doc.tick() > 0 {}
    assert!(poll_twice(&mut load).unwrap().is_ok());

    doc.bridge().module().settle();
    while doc.tick() > 0 {}
    assert_eq!(doc.pages().current_index(), Some(0));
    assert!(doc.first_page().is_none(), "already on the first page");
}

// =============================================================================
// Media player
// =============================================================================

fn open_player() -> MediaPlayer<SimulatedPlayer> {
    let module = Arc::new(video::simulated(&immediate()));
    let mut player = MediaPlayer::new(module, CallbackEntry::new(), unthrottled());
    player.activate().unwrap();
    player
}

#[test]
fn play_before_load_is_rejected() {
    let mut player = open_player();
    let mut play = player.play();
    assert_eq!(
        poll_twice(&mut play),
        Some(Err(OperationError::ImmediateCommandFailure {
            code: NativeCode::INVALID_ARG
        }))
    );
}

#[test]
fn playback_lifecycle() {
    let mut player = open_player();

    let mut load = player.load("clips/intro.mp4");
    settle(player.bridge_mut());
    let Some(Ok(VideoEvent::Opened(info))) = poll_twice(&mut load) else {
        panic!("load should open the clip");
    };
    assert_eq!((info.width, info.height), (1920, 1080));
    assert_eq!(player.status().media(), Some(&info));

    let mut play = player.play();
    settle(player.bridge_mut());
    assert_eq!(poll_twice(&mut play), Some(Ok(VideoEvent::Playing)));
    assert!(player.status().is_playing());

    let mut pause = player.pause();
    settle(player.bridge_mut());
    assert_eq!(poll_twice(&mut pause), Some(Ok(VideoEvent::Paused)));

    let mut stop = player.stop();
    settle(player.bridge_mut());
    assert_eq!(poll_twice(&mut stop), Some(Ok(VideoEvent::Stopped)));
    assert_eq!(player.status().state(), Some(VideoEvent::Stopped));
}

#[test]
fn clip_ends_after_enough_pumps() {
    let mut player = open_player();
    let mut load = player.load("clips/intro.mp4");
    settle(player.bridge_mut());
    assert!(poll_twice(&mut load).unwrap().is_ok());
    let mut play = player.play();
    settle(player.bridge_mut());
    assert!(poll_twice(&mut play).unwrap().is_ok());

    for _ in 0..SIMULATED_CLIP_PUMPS {
        player.bridge_mut().end_of_tick();
        settle(player.bridge_mut());
    }
    assert_eq!(player.status().state(), Some(VideoEvent::Ended));
    assert!(!player.status().is_playing());
}

#[test]
fn superseded_play_is_cancelled() {
    let mut player = open_player();
    let mut load = player.load("clips/intro.mp4");
    settle(player.bridge_mut());
    assert!(poll_twice(&mut load).unwrap().is_ok());

    let mut first = player.play();
    let mut second = player.play();
    settle(player.bridge_mut());
    assert_eq!(poll_twice(&mut first), Some(Err(OperationError::Cancelled)));
    assert_eq!(poll_twice(&mut second), Some(Ok(VideoEvent::Playing)));
}
