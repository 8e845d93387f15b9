//! One in-flight operation per kind.
//!
//! Starting an operation whose kind is already pending cancels the older
//! one. A slot is removed when it completes, so every operation resolves at
//! most once and late replies fall through.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::task::{Context, Poll};

use tickbridge_common::{new_correlation_id, NativeCode, OperationError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Completion<P> = Result<P, OperationError>;

struct Slot<P> {
    serial: u64,
    correlation_id: String,
    tx: oneshot::Sender<Completion<P>>,
}

impl<P> Slot<P> {
    fn complete(self, result: Completion<P>) {
        // The caller may have dropped the future; nothing to deliver then.
        let _ = self.tx.send(result);
    }
}

pub struct OperationCorrelator<K, P> {
    slots: HashMap<K, Slot<P>>,
    next_serial: u64,
}

impl<K, P> OperationCorrelator<K, P>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            next_serial: 0,
        }
    }

    /// Open a pending slot for `kind`, cancelling any operation it supersedes.
    pub fn begin(&mut self, kind: K) -> OperationFuture<P> {
        if let Some(previous) = self.slots.remove(&kind) {
            debug!(?kind, cid = %previous.correlation_id, "operation superseded");
            previous.complete(Err(OperationError::Cancelled));
        }

        let (tx, rx) = oneshot::channel();
        let correlation_id = new_correlation_id();
        debug!(?kind, cid = %correlation_id, "operation started");
        self.next_serial += 1;
        self.slots.insert(
            kind,
            Slot {
                serial: self.next_serial,
                correlation_id,
                tx,
            },
        );
        OperationFuture::new(rx)
    }

    /// Complete the pending `kind` with `payload`.
    ///
    /// Hands the payload back when nothing is pending for `kind`.
    pub fn resolve(&mut self, kind: K, payload: P) -> Result<(), P> {
        match self.slots.remove(&kind) {
            Some(slot) => {
                debug!(?kind, cid = %slot.correlation_id, "operation resolved");
                slot.complete(Ok(payload));
                Ok(())
            }
            None => Err(payload),
        }
    }

    /// Fail the pending `kind`. Returns `false` if nothing was pending.
    pub fn reject(&mut self, kind: K, error: OperationError) -> bool {
        match self.slots.remove(&kind) {
            Some(slot) => {
                debug!(?kind, cid = %slot.correlation_id, %error, "operation rejected");
                slot.complete(Err(error));
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self, kind: K) -> bool {
        self.reject(kind, OperationError::Cancelled)
    }

    /// Cancel everything pending. Returns how many slots were open.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.slots.len();
        for (kind, slot) in self.slots.drain() {
            debug!(?kind, cid = %slot.correlation_id, "operation cancelled");
            slot.complete(Err(OperationError::Cancelled));
        }
        count
    }

    /// Route an uncorrelated native failure.
    ///
    /// The most recently started operation is rejected with `code`; any other
    /// pending operation is cancelled. Returns the kind that took the failure.
    pub fn fail_latest(&mut self, code: NativeCode) -> Option<K> {
        let latest = self
            .slots
            .iter()
            .max_by_key(|(_, slot)| slot.serial)
            .map(|(kind, _)| *kind)?;

        if let Some(slot) = self.slots.remove(&latest) {
            warn!(kind = ?latest, cid = %slot.correlation_id, %code, "operation failed");
            slot.complete(Err(OperationError::AsyncFailure { code }));
        }
        self.cancel_all();
        Some(latest)
    }

    pub fn is_pending(&self, kind: K) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }
}

impl<K, P> Default for OperationCorrelator<K, P>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Completion of a correlated operation.
///
/// Never completes on its first poll, even when the result is already
/// known: the caller always observes the outcome on a later yield.
#[must_use = "operation results are only observed by awaiting the future"]
pub struct OperationFuture<P> {
    rx: oneshot::Receiver<Completion<P>>,
    yielded: bool,
}

impl<P> OperationFuture<P> {
    fn new(rx: oneshot::Receiver<Completion<P>>) -> Self {
        Self { rx, yielded: false }
    }

    /// A future carrying a result that is known up front.
    pub fn ready(result: Completion<P>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self::new(rx)
    }
}

impl<P> Future for OperationFuture<P> {
    type Output = Completion<P>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.yielded {
            self.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without completing: the correlator went away.
            Poll::Ready(Err(_)) => Poll::Ready(Err(OperationError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<P> fmt::Debug for OperationFuture<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationFuture")
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}
