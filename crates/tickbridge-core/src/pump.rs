//! Per-tick driver: drains the event queue into a handler and issues the
//! native pump call.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tickbridge_common::{HandlerError, NativeInstanceId, PumpToken};
use tickbridge_config::BridgeConfig;
use tracing::{trace, warn};

use crate::queue::{EventQueue, QueueSender};

/// Hard cap on callbacks executed in one tick, whatever the config says.
pub const MAX_CALLBACKS_PER_TICK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Execute at most one callback per tick.
    pub one_callback_per_tick: bool,
    /// Per-tick cap when not throttled. `None` means no cap beyond
    /// [`MAX_CALLBACKS_PER_TICK`].
    pub batch_limit: Option<usize>,
    /// Issue the native pump call at the end of each tick.
    pub pump_enabled: bool,
}

impl DispatchConfig {
    fn per_tick_limit(&self) -> usize {
        if self.one_callback_per_tick {
            1
        } else {
            self.batch_limit
                .map_or(MAX_CALLBACKS_PER_TICK, |n| n.clamp(1, MAX_CALLBACKS_PER_TICK))
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            one_callback_per_tick: true,
            batch_limit: None,
            pump_enabled: true,
        }
    }
}

impl From<&BridgeConfig> for DispatchConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            one_callback_per_tick: config.dispatch.one_callback_per_tick,
            batch_limit: match config.dispatch.batch_limit {
                0 => None,
                n => Some(n as usize),
            },
            pump_enabled: config.pump.enabled,
        }
    }
}

/// Counters since the pump was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub ticks: u64,
    pub delivered: u64,
    pub faults: u64,
    pub pumps: u64,
}

pub struct DispatchPump<E> {
    queue: EventQueue<E>,
    config: DispatchConfig,
    sequence: u16,
    running: bool,
    stats: PumpStats,
}

impl<E> DispatchPump<E> {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            queue: EventQueue::new(),
            config,
            sequence: 0,
            running: false,
            stats: PumpStats::default(),
        }
    }

    pub fn sender(&self) -> QueueSender<E> {
        self.queue.sender()
    }

    pub fn queue(&self) -> &EventQueue<E> {
        &self.queue
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop both loops and retire the current queue. Senders handed out
    /// before the halt are closed; later ones feed a fresh, empty queue.
    pub fn halt(&mut self) {
        self.running = false;
        self.queue.close();
        self.queue = EventQueue::new();
    }

    /// Stop both loops and close the queue for good.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.queue.close();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn stats(&self) -> PumpStats {
        self.stats
    }

    /// Hand this tick's share of queued items to `handler`.
    ///
    /// Each item runs in its own protected frame: an error or panic is
    /// logged and the next item still runs. Returns how many ran.
    pub fn drain_tick<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(E) -> Result<(), HandlerError>,
    {
        if !self.running || self.queue.is_empty() {
            return 0;
        }
        self.stats.ticks += 1;

        let batch = self.queue.drain_into(Some(self.config.per_tick_limit()));
        let count = batch.len();
        for item in batch {
            if let Err(e) = run_protected(&mut handler, item) {
                self.stats.faults += 1;
                warn!(error = %e, "callback handler failed");
            }
        }
        self.stats.delivered += count as u64;
        count
    }

    /// Issue the end-of-tick pump call for `instance`.
    ///
    /// The sequence advances on every running tick. No call is made for an
    /// invalid instance or when pumping is disabled.
    pub fn pump_tick<F>(&mut self, instance: NativeInstanceId, pump: F) -> Option<PumpToken>
    where
        F: FnOnce(PumpToken),
    {
        if !self.running {
            return None;
        }
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        if !self.config.pump_enabled || !instance.is_valid() {
            return None;
        }
        let token = PumpToken::pack(sequence, instance);
        trace!(sequence, %instance, "native pump");
        pump(token);
        self.stats.pumps += 1;
        Some(token)
    }
}

fn run_protected<E, F>(handler: &mut F, item: E) -> Result<(), HandlerError>
where
    F: FnMut(E) -> Result<(), HandlerError>,
{
    protect(|| handler(item))
}

/// Run `f`, turning a panic into a [`HandlerError`].
pub(crate) fn protect<F>(f: F) -> Result<(), HandlerError>
where
    F: FnOnce() -> Result<(), HandlerError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(HandlerError::new(format!(
            "handler panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
