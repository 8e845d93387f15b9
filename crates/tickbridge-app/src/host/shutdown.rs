//! Graceful shutdown and the run summary.

use tracing::info;

use super::core::{Component, Host};
use super::types::{Outcome, OutcomeKind, StopReason, Summary};
use crate::cli::Feature;

// =============================================================================
// SHUTDOWN
// =============================================================================

impl<C: Component> Host<C> {
    /// Deactivate the bridge and settle what is still in flight.
    ///
    /// Order matters:
    /// 1. Drop the remaining script so nothing new is issued
    /// 2. Deactivate the bridge (cancels pending operations, releases native)
    /// 3. Poll in-flight futures until their cancellation is observed
    /// 4. Record anything still unsettled as abandoned
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        info!(tick = self.tick, in_flight = self.in_flight.len(), "shutting down host");

        self.script.clear();
        self.component.bridge_mut().deactivate();

        // Two polls: a future that never yielded needs one before it settles.
        self.poll_in_flight();
        self.poll_in_flight();

        let tick = self.tick;
        for op in self.in_flight.drain(..) {
            self.outcomes.push(Outcome {
                label: op.label,
                issued_at: op.issued_at,
                settled_at: tick,
                kind: OutcomeKind::Abandoned,
            });
        }

        self.shut_down = true;
        info!("host shutdown complete");
    }

    pub fn summary(&self, feature: Feature, stop: StopReason) -> Summary {
        let stats = self.component.bridge().stats();
        Summary {
            feature: feature.name(),
            stop,
            ticks: self.tick,
            delivered: stats.delivered,
            faults: stats.faults,
            pumps: stats.pumps,
            status: self.component.describe(),
            outcomes: self.outcomes.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tickbridge_config::schema::LoopbackSection;
    use tickbridge_core::{BridgeState, CallbackEntry, DispatchConfig};
    use tickbridge_plugins::{video, MediaPlayer};

    use super::*;
    use crate::host::script::ScriptStep;

    type Player = MediaPlayer<video::SimulatedPlayer>;

    fn player(reply_delay_ms: u32) -> Player {
        let section = LoopbackSection {
            reply_delay_ms,
            ..LoopbackSection::default()
        };
        MediaPlayer::new(
            Arc::new(video::simulated(&section)),
            CallbackEntry::new(),
            DispatchConfig::default(),
        )
    }

    #[test]
    fn shutdown_on_fresh_host_disposes_the_bridge() {
        let mut host = Host::start(player(0), Vec::new()).unwrap();

        host.shutdown();

        assert_eq!(host.component().bridge().state(), BridgeState::Disposed);
        assert!(host.outcomes().is_empty());
        assert_eq!(host.step(), 0);
        assert_eq!(host.tick_count(), 0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut host = Host::start(player(0), Vec::new()).unwrap();

        host.shutdown();
        host.shutdown();

        assert_eq!(host.component().bridge().state(), BridgeState::Disposed);
    }

    #[test]
    fn pending_operation_is_reported_cancelled() {
        let script = vec![ScriptStep::new(1, "load", |p: &mut Player| {
            Some(p.load("clip.mp4"))
        })];
        let mut host = Host::start(player(300), script).unwrap();

        host.step();
        assert_eq!(host.in_flight(), 1);
        host.shutdown();

        assert_eq!(host.in_flight(), 0);
        let outcome = &host.outcomes()[0];
        assert_eq!(outcome.kind, OutcomeKind::Cancelled);
        assert_eq!(outcome.settled_at, 1);
    }

    #[test]
    fn unissued_steps_are_dropped() {
        let script = vec![ScriptStep::new(50, "play", |p: &mut Player| Some(p.play()))];
        let mut host = Host::start(player(0), script).unwrap();

        host.step();
        host.shutdown();

        assert!(host.outcomes().is_empty());
        assert!(host.is_idle());
    }

    #[test]
    fn summary_reports_pump_stats() {
        let mut host = Host::start(player(0), Vec::new()).unwrap();
        host.step();
        host.step();
        host.shutdown();

        let summary = host.summary(Feature::Video, StopReason::Completed);
        assert_eq!(summary.feature, "video");
        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.pumps, 2);
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.status, "state=none media=none transitions=0");
    }
}
