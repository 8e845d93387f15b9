//! Per-owner bridge lifecycle.
//!
//! `Uninitialized -> Active -> Disposed`. A handle registers its inbox with
//! the feature's [`CallbackEntry`] before calling native `create`, so
//! callbacks fired during `create` are queued rather than lost.

use std::sync::Arc;

use tickbridge_common::{
    BridgeError, CallbackEnvelope, HandlerError, NativeCode, NativeInstanceId, OperationError,
    OwnerToken, PumpToken, Result,
};
use tracing::{debug, error, info, warn};

use crate::correlator::{OperationCorrelator, OperationFuture};
use crate::native::{CallbackEntry, NativeModule, NotificationHandler, PluginCommand, PluginEvent};
use crate::pump::{protect, DispatchConfig, DispatchPump, PumpStats};

type KindOf<N> = <<N as NativeModule>::Event as PluginEvent>::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Active,
    Disposed,
}

pub struct NativeBridgeHandle<N, H>
where
    N: NativeModule,
    H: NotificationHandler<N::Event>,
{
    module: Arc<N>,
    entry: CallbackEntry<N::Event>,
    handler: H,
    pump: DispatchPump<CallbackEnvelope<N::Event>>,
    correlator: OperationCorrelator<KindOf<N>, N::Event>,
    state: BridgeState,
    token: Option<OwnerToken>,
    instance: NativeInstanceId,
}

impl<N, H> NativeBridgeHandle<N, H>
where
    N: NativeModule,
    H: NotificationHandler<N::Event>,
{
    pub fn new(
        module: Arc<N>,
        entry: CallbackEntry<N::Event>,
        handler: H,
        config: DispatchConfig,
    ) -> Self {
        Self {
            module,
            entry,
            handler,
            pump: DispatchPump::new(config),
            correlator: OperationCorrelator::new(),
            state: BridgeState::Uninitialized,
            token: None,
            instance: NativeInstanceId::INVALID,
        }
    }

    /// Register with the callback entry, create the native instance and
    /// start the per-tick loops.
    ///
    /// On a failed `create` the registration is rolled back and the handle
    /// stays `Uninitialized`.
    pub fn activate(&mut self) -> Result<()> {
        match self.state {
            BridgeState::Active => return Err(BridgeError::AlreadyActive),
            BridgeState::Disposed => return Err(BridgeError::Disposed),
            BridgeState::Uninitialized => {}
        }

        let token = self.entry.registry().register(Arc::new(self.pump.sender()));
        self.pump.start();

        match self.module.create(self.entry.clone(), token) {
            Ok(instance) => {
                self.token = Some(token);
                self.instance = instance;
                self.state = BridgeState::Active;
                info!(%token, %instance, "bridge activated");
                Ok(())
            }
            Err(code) => {
                self.pump.halt();
                self.entry.registry().unregister(token);
                error!(%token, %code, "native create failed");
                Err(BridgeError::CreateFailed { code })
            }
        }
    }

    /// Issue `command` and return a future for its correlated reply.
    ///
    /// A pending operation of the same kind is cancelled first. If the
    /// native side rejects the command outright the future fails with
    /// [`OperationError::ImmediateCommandFailure`].
    pub fn operation(&mut self, command: N::Command) -> OperationFuture<N::Event> {
        if self.state != BridgeState::Active {
            return OperationFuture::ready(Err(OperationError::Inactive));
        }

        let kind = command.kind();
        let future = self.correlator.begin(kind);
        let code = self.module.issue(self.instance, &command);
        if !code.is_success() {
            warn!(?kind, %code, "native command rejected");
            self.correlator
                .reject(kind, OperationError::ImmediateCommandFailure { code });
        }
        future
    }

    /// Cancel the pending operation of `kind`, e.g. on a caller-side timeout.
    /// Native work already in flight is not stopped; its reply is dropped.
    pub fn cancel(&mut self, kind: KindOf<N>) -> bool {
        self.correlator.cancel(kind)
    }

    pub fn cancel_all(&mut self) -> usize {
        self.correlator.cancel_all()
    }

    /// Drain this tick's callbacks into the correlator and the handler.
    pub fn tick(&mut self) -> usize {
        if self.state != BridgeState::Active {
            return 0;
        }
        let handler = &mut self.handler;
        let correlator = &mut self.correlator;
        self.pump
            .drain_tick(|envelope| route(handler, correlator, envelope))
    }

    /// End-of-tick native pump.
    pub fn end_of_tick(&mut self) -> Option<PumpToken> {
        if self.state != BridgeState::Active {
            return None;
        }
        let module = &self.module;
        self.pump.pump_tick(self.instance, |token| module.pump(token))
    }

    /// Tear down: stop the loops, drop queued callbacks, cancel pending
    /// operations, release the native instance and unregister.
    ///
    /// Idempotent. Also runs on drop.
    pub fn deactivate(&mut self) {
        match self.state {
            BridgeState::Disposed => return,
            BridgeState::Uninitialized => {
                self.pump.shutdown();
                self.state = BridgeState::Disposed;
                return;
            }
            BridgeState::Active => {}
        }

        self.pump.shutdown();
        let cancelled = self.correlator.cancel_all();
        if self.instance.is_valid() {
            self.module.release(self.instance);
        }
        if let Some(token) = self.token.take() {
            self.entry.registry().unregister(token);
        }
        info!(instance = %self.instance, cancelled, "bridge deactivated");
        self.instance = NativeInstanceId::INVALID;
        self.state = BridgeState::Disposed;
    }

    /// Resolve once a callback is queued or the handle shuts down.
    pub async fn callbacks_ready(&self) {
        self.pump.queue().notified().await
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == BridgeState::Active
    }

    pub fn token(&self) -> Option<OwnerToken> {
        self.token
    }

    pub fn instance_id(&self) -> NativeInstanceId {
        self.instance
    }

    pub fn is_pending(&self, kind: KindOf<N>) -> bool {
        self.correlator.is_pending(kind)
    }

    pub fn queued(&self) -> usize {
        self.pump.queue().len()
    }

    pub fn stats(&self) -> PumpStats {
        self.pump.stats()
    }

    pub fn module(&self) -> &Arc<N> {
        &self.module
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

impl<N, H> Drop for NativeBridgeHandle<N, H>
where
    N: NativeModule,
    H: NotificationHandler<N::Event>,
{
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn route<E, H>(
    handler: &mut H,
    correlator: &mut OperationCorrelator<E::Kind, E>,
    envelope: CallbackEnvelope<E>,
) -> std::result::Result<(), HandlerError>
where
    E: PluginEvent,
    H: NotificationHandler<E>,
{
    match envelope {
        CallbackEnvelope::Failure { code } => route_failure(handler, correlator, code),
        CallbackEnvelope::StateEvent(event) => {
            // A panicking observer must not strand the operation this event completes.
            let observed = protect(|| {
                handler.observe(&event);
                Ok(())
            });
            let routed = match event.completes() {
                Some(kind) => {
                    if let Err(event) = correlator.resolve(kind, event) {
                        debug!(?kind, ?event, "reply with no pending operation dropped");
                    }
                    Ok(())
                }
                None => handler.on_notification(event),
            };
            observed.and(routed)
        }
    }
}

fn route_failure<E, H>(
    handler: &mut H,
    correlator: &mut OperationCorrelator<E::Kind, E>,
    code: NativeCode,
) -> std::result::Result<(), HandlerError>
where
    E: PluginEvent,
    H: NotificationHandler<E>,
{
    let observed = protect(|| {
        handler.on_failure(code);
        Ok(())
    });
    if correlator.fail_latest(code).is_none() {
        error!(%code, "native failure with no pending operation");
    }
    observed
}
