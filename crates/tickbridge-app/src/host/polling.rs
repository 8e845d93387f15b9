//! Fixed-cadence tick loop.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::core::{Component, Host};
use super::types::StopReason;

impl<C: Component> Host<C> {
    /// Step once per `period` until `ticks` host ticks have run or ctrl-c
    /// arrives. Ticks that fall behind are delayed, never bunched.
    pub async fn run(&mut self, ticks: u64, period: Duration) -> StopReason {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(interrupt);

        while self.tick < ticks && !self.shut_down {
            tokio::select! {
                _ = timer.tick() => {
                    let delivered = self.step();
                    if delivered > 0 {
                        debug!(tick = self.tick, delivered, "callbacks executed");
                    }
                }
                _ = &mut interrupt => {
                    info!(tick = self.tick, "interrupted, stopping tick loop");
                    return StopReason::Interrupted;
                }
            }
        }
        StopReason::Completed
    }
}
