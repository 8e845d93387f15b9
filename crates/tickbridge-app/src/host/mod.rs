//! Scripted host for a single bridge.
//!
//! Owns one feature component, issues its script at fixed tick numbers,
//! drives the bridge's two per-tick loops and records every operation
//! outcome until shutdown.

mod core;
mod polling;
mod script;
mod shutdown;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tickbridge_common::Result;
use tickbridge_config::BridgeConfig;
use tickbridge_core::{CallbackEntry, DispatchConfig};
use tickbridge_plugins::{capture, ffi, pdf, video, CameraCapture, MediaPlayer, PdfDocument};
use tracing::info;

use crate::cli::Feature;

use self::core::{Component, Host};
use self::types::Summary;

/// Build the loopback module for `feature`, run its script for `ticks`
/// host ticks and return the run summary.
pub async fn run(feature: Feature, config: &BridgeConfig, ticks: u64) -> Result<Summary> {
    let dispatch = DispatchConfig::from(config);
    let interval = Duration::from_millis(config.pump.tick_interval_ms.max(1).into());
    info!(
        feature = feature.name(),
        ticks,
        interval_ms = interval.as_millis() as u64,
        "starting host"
    );

    match feature {
        Feature::Capture => {
            ffi::install_capture_entry(CallbackEntry::new());
            let entry = ffi::capture_entry().cloned().unwrap_or_default();
            let module = Arc::new(capture::simulated(&config.loopback));
            let component = CameraCapture::new(module, entry, dispatch);
            drive(feature, component, script::capture(), ticks, interval).await
        }
        Feature::Pdf => {
            ffi::install_pdf_entry(CallbackEntry::new());
            let entry = ffi::pdf_entry().cloned().unwrap_or_default();
            let module = Arc::new(pdf::simulated(&config.loopback));
            let component = PdfDocument::new(module, entry, dispatch);
            drive(feature, component, script::pdf(), ticks, interval).await
        }
        Feature::Video => {
            ffi::install_video_entry(CallbackEntry::new());
            let entry = ffi::video_entry().cloned().unwrap_or_default();
            let module = Arc::new(video::simulated(&config.loopback));
            let component = MediaPlayer::new(module, entry, dispatch);
            drive(feature, component, script::video(), ticks, interval).await
        }
    }
}

async fn drive<C: Component>(
    feature: Feature,
    component: C,
    script: Vec<script::ScriptStep<C>>,
    ticks: u64,
    interval: Duration,
) -> Result<Summary> {
    let mut host = Host::start(component, script)?;
    let stop = host.run(ticks, interval).await;
    host.shutdown();
    Ok(host.summary(feature, stop))
}
