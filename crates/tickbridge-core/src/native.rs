//! Seams between the bridge and a native component.
//!
//! A feature plugs in by describing its events and commands
//! ([`PluginEvent`], [`PluginCommand`]) and by implementing
//! [`NativeModule`] over whatever actually produces the callbacks. Native
//! threads reach the host only through a [`CallbackEntry`].

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use tickbridge_common::{
    CallbackEnvelope, HandlerError, NativeCode, NativeInstanceId, OwnerToken, PumpToken,
};
use tracing::{trace, warn};

use crate::queue::QueueSender;
use crate::registry::HandleRegistry;

/// Feature-specific state change carried by a `StateEvent` envelope.
pub trait PluginEvent: fmt::Debug + Send + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + 'static;

    /// The operation kind this event completes, or `None` for steady-state
    /// notifications such as frames.
    fn completes(&self) -> Option<Self::Kind>;
}

/// A command the host issues to the native component.
pub trait PluginCommand: fmt::Debug {
    type Kind;

    fn kind(&self) -> Self::Kind;
}

/// Native component surface used by a bridge handle.
///
/// `create` may call back into `entry` before it returns, from any thread.
pub trait NativeModule: Send + Sync + 'static {
    type Event: PluginEvent;
    type Command: PluginCommand<Kind = <Self::Event as PluginEvent>::Kind>;

    fn create(
        &self,
        entry: CallbackEntry<Self::Event>,
        token: OwnerToken,
    ) -> Result<NativeInstanceId, NativeCode>;

    fn release(&self, instance: NativeInstanceId);

    /// Per-tick pump. The native side demultiplexes on `token.instance()`.
    fn pump(&self, token: PumpToken);

    /// Issue a command. A non-success code means it was rejected outright
    /// and no reply will follow.
    fn issue(&self, instance: NativeInstanceId, command: &Self::Command) -> NativeCode;
}

/// Host-side consumer of events that no pending operation claims.
pub trait NotificationHandler<E> {
    /// Sees every state event before routing, including ones that complete
    /// an operation.
    fn observe(&mut self, _event: &E) {}

    fn on_notification(&mut self, event: E) -> Result<(), HandlerError>;

    fn on_failure(&mut self, _code: NativeCode) {}
}

/// [`NotificationHandler`] backed by a closure. See [`handler_fn`].
pub struct FnHandler<F, E> {
    f: F,
    _event: PhantomData<fn(E)>,
}

pub fn handler_fn<F, E>(f: F) -> FnHandler<F, E>
where
    F: FnMut(E) -> Result<(), HandlerError>,
{
    FnHandler {
        f,
        _event: PhantomData,
    }
}

impl<F, E> NotificationHandler<E> for FnHandler<F, E>
where
    F: FnMut(E) -> Result<(), HandlerError>,
{
    fn on_notification(&mut self, event: E) -> Result<(), HandlerError> {
        (self.f)(event)
    }
}

/// What happened to an envelope handed to [`CallbackEntry::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The token did not resolve to a live owner.
    Stale,
    /// The owner is tearing down and no longer accepts callbacks.
    Closed,
}

pub type Inbox<E> = QueueSender<CallbackEnvelope<E>>;

/// Callback entry point shared by every owner of one feature.
///
/// Safe to invoke from any thread. An envelope for an unknown or released
/// token is dropped.
pub struct CallbackEntry<E> {
    registry: Arc<HandleRegistry<Inbox<E>>>,
}

impl<E> Clone for CallbackEntry<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> CallbackEntry<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(HandleRegistry::new()),
        }
    }

    pub fn registry(&self) -> &HandleRegistry<Inbox<E>> {
        &self.registry
    }

    pub fn invoke(&self, token: OwnerToken, envelope: CallbackEnvelope<E>) -> Delivery {
        let Some(inbox) = self.registry.resolve(token) else {
            warn!(%token, "callback for unknown owner dropped");
            return Delivery::Stale;
        };
        if inbox.push(envelope) {
            trace!(%token, "callback queued");
            Delivery::Delivered
        } else {
            trace!(%token, "callback for closing owner dropped");
            Delivery::Closed
        }
    }
}

impl<E> Default for CallbackEntry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;

    #[test]
    fn invoke_routes_to_registered_inbox() {
        let entry = CallbackEntry::new();
        let mut queue = EventQueue::new();
        let token = entry.registry().register(Arc::new(queue.sender()));

        assert_eq!(
            entry.invoke(token, CallbackEnvelope::StateEvent(5u8)),
            Delivery::Delivered
        );
        assert_eq!(
            queue.drain_into(None),
            vec![CallbackEnvelope::StateEvent(5u8)]
        );
    }

    #[test]
    fn invoke_with_stale_token_is_dropped() {
        let entry: CallbackEntry<u8> = CallbackEntry::new();
        let queue = EventQueue::new();
        let token = entry.registry().register(Arc::new(queue.sender()));
        entry.registry().unregister(token);

        assert_eq!(entry.invoke(token, CallbackEnvelope::failure(1)), Delivery::Stale);
        assert!(queue.is_empty());
    }

    #[test]
    fn invoke_on_closed_inbox() {
        let entry: CallbackEntry<u8> = CallbackEntry::new();
        let mut queue = EventQueue::new();
        let token = entry.registry().register(Arc::new(queue.sender()));
        queue.close();

        assert_eq!(entry.invoke(token, CallbackEnvelope::failure(1)), Delivery::Closed);
    }

    #[test]
    fn tokens_route_to_their_own_owner() {
        let entry = CallbackEntry::new();
        let mut a = EventQueue::new();
        let mut b = EventQueue::new();
        let ta = entry.registry().register(Arc::new(a.sender()));
        let tb = entry.registry().register(Arc::new(b.sender()));

        entry.invoke(tb, CallbackEnvelope::StateEvent('b'));
        entry.invoke(ta, CallbackEnvelope::StateEvent('a'));

        assert_eq!(a.drain_into(None), vec![CallbackEnvelope::StateEvent('a')]);
        assert_eq!(b.drain_into(None), vec![CallbackEnvelope::StateEvent('b')]);
    }

    #[test]
    fn fn_handler_forwards_notifications() {
        let mut seen = Vec::new();
        {
            let mut handler = handler_fn(|e: u32| {
                seen.push(e);
                Ok(())
            });
            handler.observe(&1);
            handler.on_failure(NativeCode(1));
            handler.on_notification(2).unwrap();
        }
        assert_eq!(seen, vec![2]);
    }
}
