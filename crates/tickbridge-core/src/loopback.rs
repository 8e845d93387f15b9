//! Thread-backed stand-in for a native component.
//!
//! Replies are produced by a responder closure and delivered through the
//! [`CallbackEntry`] from worker threads, the way a real native module calls
//! back from its own threads. Used by tests and the demo host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tickbridge_common::{CallbackEnvelope, NativeCode, NativeInstanceId, OwnerToken, PumpToken};
use tickbridge_config::schema::LoopbackSection;
use tracing::{debug, trace, warn};

use crate::lock;
use crate::native::{CallbackEntry, NativeModule, PluginCommand, PluginEvent};

/// Outcome of one command as the loopback native sees it.
#[derive(Debug)]
pub struct Reply<E> {
    pub code: NativeCode,
    pub envelopes: Vec<CallbackEnvelope<E>>,
}

impl<E> Reply<E> {
    pub fn accept(envelopes: Vec<CallbackEnvelope<E>>) -> Self {
        Self {
            code: NativeCode::SUCCESS,
            envelopes,
        }
    }

    pub fn accept_one(event: E) -> Self {
        Self::accept(vec![CallbackEnvelope::StateEvent(event)])
    }

    /// Accepted, but nothing is sent back.
    pub fn silent() -> Self {
        Self::accept(Vec::new())
    }

    pub fn reject(code: NativeCode) -> Self {
        Self {
            code,
            envelopes: Vec::new(),
        }
    }
}

type Responder<C, E> = Box<dyn Fn(&C) -> Reply<E> + Send + Sync>;
type PumpSource<E> = Box<dyn Fn(PumpToken) -> Vec<CallbackEnvelope<E>> + Send + Sync>;

struct Binding<E> {
    entry: CallbackEntry<E>,
    token: OwnerToken,
}

impl<E> Clone for Binding<E> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            token: self.token,
        }
    }
}

pub struct LoopbackModule<C, E> {
    responder: Responder<C, E>,
    pump_source: Option<PumpSource<E>>,
    reply_delay: Duration,
    next_instance: AtomicI32,
    issued: AtomicUsize,
    create_failure: Mutex<Option<NativeCode>>,
    on_create: Mutex<Vec<CallbackEnvelope<E>>>,
    bindings: Mutex<HashMap<NativeInstanceId, Binding<E>>>,
    pumps: Mutex<Vec<PumpToken>>,
    released: Mutex<Vec<NativeInstanceId>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<C, E> LoopbackModule<C, E>
where
    E: PluginEvent,
{
    pub fn new<R>(responder: R) -> Self
    where
        R: Fn(&C) -> Reply<E> + Send + Sync + 'static,
    {
        Self::from_config(&LoopbackSection::default(), responder)
    }

    pub fn from_config<R>(section: &LoopbackSection, responder: R) -> Self
    where
        R: Fn(&C) -> Reply<E> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            pump_source: None,
            reply_delay: Duration::from_millis(section.reply_delay_ms as u64),
            next_instance: AtomicI32::new(section.instance_start),
            issued: AtomicUsize::new(0),
            create_failure: Mutex::new(None),
            on_create: Mutex::new(Vec::new()),
            bindings: Mutex::new(HashMap::new()),
            pumps: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn with_instance_start(self, start: i32) -> Self {
        self.next_instance.store(start, Ordering::SeqCst);
        self
    }

    /// Produce callbacks from each pump call, like a native render hook.
    pub fn with_pump_source<F>(mut self, source: F) -> Self
    where
        F: Fn(PumpToken) -> Vec<CallbackEnvelope<E>> + Send + Sync + 'static,
    {
        self.pump_source = Some(Box::new(source));
        self
    }

    /// Make the next `create` fail with `code`.
    pub fn fail_next_create(&self, code: NativeCode) {
        *lock(&self.create_failure) = Some(code);
    }

    /// Envelopes delivered from another thread before the next `create`
    /// returns.
    pub fn emit_on_create(&self, envelopes: Vec<CallbackEnvelope<E>>) {
        lock(&self.on_create).extend(envelopes);
    }

    /// Deliver an unsolicited envelope to the owner of `instance`.
    pub fn emit(&self, instance: NativeInstanceId, envelope: CallbackEnvelope<E>) -> bool {
        match self.binding(instance) {
            Some(binding) => {
                self.spawn_delivery(binding, vec![envelope], self.reply_delay);
                true
            }
            None => false,
        }
    }

    /// Deliver to a raw owner token, bypassing instance lookup.
    pub fn emit_to(&self, entry: &CallbackEntry<E>, token: OwnerToken, envelope: CallbackEnvelope<E>) {
        let binding = Binding {
            entry: entry.clone(),
            token,
        };
        self.spawn_delivery(binding, vec![envelope], self.reply_delay);
    }

    /// Wait for every in-flight delivery to finish.
    pub fn settle(&self) {
        loop {
            let workers = std::mem::take(&mut *lock(&self.workers));
            if workers.is_empty() {
                return;
            }
            for worker in workers {
                if worker.join().is_err() {
                    warn!("loopback worker panicked");
                }
            }
        }
    }

    pub fn pump_tokens(&self) -> Vec<PumpToken> {
        lock(&self.pumps).clone()
    }

    pub fn released(&self) -> Vec<NativeInstanceId> {
        lock(&self.released).clone()
    }

    pub fn live_instances(&self) -> usize {
        lock(&self.bindings).len()
    }

    /// Commands accepted or rejected by `issue` so far.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    fn binding(&self, instance: NativeInstanceId) -> Option<Binding<E>> {
        lock(&self.bindings).get(&instance).cloned()
    }

    fn spawn_delivery(&self, binding: Binding<E>, envelopes: Vec<CallbackEnvelope<E>>, delay: Duration) {
        if envelopes.is_empty() {
            return;
        }
        let spawned = thread::Builder::new()
            .name("loopback-native".into())
            .spawn(move || {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                for envelope in envelopes {
                    binding.entry.invoke(binding.token, envelope);
                }
            });
        match spawned {
            Ok(worker) => lock(&self.workers).push(worker),
            Err(e) => warn!(error = %e, "failed to spawn loopback worker"),
        }
    }
}

impl<C, E> NativeModule for LoopbackModule<C, E>
where
    C: PluginCommand<Kind = E::Kind> + Send + Sync + 'static,
    E: PluginEvent,
{
    type Event = E;
    type Command = C;

    fn create(
        &self,
        entry: CallbackEntry<E>,
        token: OwnerToken,
    ) -> Result<NativeInstanceId, NativeCode> {
        if let Some(code) = lock(&self.create_failure).take() {
            return Err(code);
        }

        let instance = NativeInstanceId(self.next_instance.fetch_add(1, Ordering::SeqCst));
        let binding = Binding { entry, token };
        lock(&self.bindings).insert(instance, binding.clone());
        debug!(%instance, %token, "loopback instance created");

        let early = std::mem::take(&mut *lock(&self.on_create));
        if !early.is_empty() {
            self.spawn_delivery(binding, early, Duration::ZERO);
            self.settle();
        }
        Ok(instance)
    }

    fn release(&self, instance: NativeInstanceId) {
        if lock(&self.bindings).remove(&instance).is_some() {
            lock(&self.released).push(instance);
            debug!(%instance, "loopback instance released");
        }
    }

    fn pump(&self, token: PumpToken) {
        lock(&self.pumps).push(token);

        let Some(source) = &self.pump_source else {
            return;
        };
        let target = lock(&self.bindings)
            .iter()
            .find(|(id, _)| id.0 as u16 == token.instance())
            .map(|(_, binding)| binding.clone());
        match target {
            Some(binding) => self.spawn_delivery(binding, source(token), Duration::ZERO),
            None => trace!(raw = token.as_raw(), "pump for unknown instance"),
        }
    }

    fn issue(&self, instance: NativeInstanceId, command: &C) -> NativeCode {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let Some(binding) = self.binding(instance) else {
            warn!(%instance, ?command, "command for unknown instance");
            return NativeCode::INVALID_ARG;
        };

        let reply = (self.responder)(command);
        trace!(%instance, ?command, code = %reply.code, "loopback command");
        if reply.code.is_success() {
            self.spawn_delivery(binding, reply.envelopes, self.reply_delay);
        }
        reply.code
    }
}

impl<C, E> Drop for LoopbackModule<C, E> {
    fn drop(&mut self) {
        let workers = std::mem::take(
            self.workers
                .get_mut()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        for worker in workers {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug)]
    struct Echo(u32);

    impl PluginEvent for Ping {
        type Kind = ();

        fn completes(&self) -> Option<()> {
            Some(())
        }
    }

    impl PluginCommand for Echo {
        type Kind = ();

        fn kind(&self) {}
    }

    fn module() -> LoopbackModule<Echo, Ping> {
        LoopbackModule::new(|c: &Echo| Reply::accept_one(Ping(c.0))).with_reply_delay(Duration::ZERO)
    }

    fn bound(module: &LoopbackModule<Echo, Ping>) -> (EventQueue<CallbackEnvelope<Ping>>, NativeInstanceId) {
        let entry = CallbackEntry::new();
        let queue = EventQueue::new();
        let token = entry.registry().register(Arc::new(queue.sender()));
        let instance = module.create(entry, token).unwrap();
        (queue, instance)
    }

    #[test]
    fn instances_count_up_from_start() {
        let module = module();
        let (_qa, a) = bound(&module);
        let (_qb, b) = bound(&module);
        assert_eq!(a, NativeInstanceId::START);
        assert_eq!(b, NativeInstanceId(NativeInstanceId::START.0 + 1));
        assert_eq!(module.live_instances(), 2);
    }

    #[test]
    fn custom_instance_start() {
        let module = module().with_instance_start(7);
        let (_q, instance) = bound(&module);
        assert_eq!(instance, NativeInstanceId(7));
    }

    #[test]
    fn issue_delivers_reply() {
        let module = module();
        let (mut queue, instance) = bound(&module);
        assert!(module.issue(instance, &Echo(3)).is_success());
        module.settle();
        assert_eq!(queue.drain_into(None), vec![CallbackEnvelope::StateEvent(Ping(3))]);
        assert_eq!(module.issued(), 1);
    }

    #[test]
    fn issue_to_unknown_instance() {
        let module = module();
        assert_eq!(module.issue(NativeInstanceId(99), &Echo(1)), NativeCode::INVALID_ARG);
    }

    #[test]
    fn create_burst_arrives_before_return() {
        let module = module();
        module.emit_on_create(vec![CallbackEnvelope::StateEvent(Ping(0))]);
        let (queue, _) = bound(&module);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn fail_next_create_is_one_shot() {
        let module = module();
        module.fail_next_create(NativeCode(1));
        let entry = CallbackEntry::new();
        assert_eq!(module.create(entry.clone(), OwnerToken::new(0, 1)), Err(NativeCode(1)));
        assert!(module.create(entry, OwnerToken::new(0, 1)).is_ok());
    }

    #[test]
    fn release_is_recorded_once() {
        let module = module();
        let (_q, instance) = bound(&module);
        module.release(instance);
        module.release(instance);
        assert_eq!(module.released(), vec![instance]);
        assert_eq!(module.live_instances(), 0);
        assert!(!module.emit(instance, CallbackEnvelope::failure(1)));
    }

    #[test]
    fn pump_source_feeds_matching_instance() {
        let module = module()
            .with_pump_source(|t| vec![CallbackEnvelope::StateEvent(Ping(t.sequence() as u32))]);
        let (mut queue, instance) = bound(&module);
        module.pump(PumpToken::pack(4, instance));
        module.pump(PumpToken::pack(5, NativeInstanceId(1)));
        module.settle();
        assert_eq!(queue.drain_into(None), vec![CallbackEnvelope::StateEvent(Ping(4))]);
        assert_eq!(module.pump_tokens().len(), 2);
    }
}
