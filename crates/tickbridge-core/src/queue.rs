//! Multi-producer, single-consumer queue between native threads and the
//! host tick.
//!
//! Producers append into an `incoming` buffer under a short lock. The
//! consumer swaps that buffer out wholesale and walks it without holding the
//! lock, so native threads never wait on host handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::lock;

struct Shared<E> {
    incoming: Mutex<Vec<E>>,
    closed: AtomicBool,
    notify: Notify,
}

/// Producer side. Cheap to clone and safe to use from any thread.
pub struct QueueSender<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for QueueSender<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> QueueSender<E> {
    /// Append an item. Returns `false` if the queue has been closed.
    pub fn push(&self, item: E) -> bool {
        {
            let mut incoming = lock(&self.shared.incoming);
            // Checked under the lock so a push cannot land after close + clear.
            if self.shared.closed.load(Ordering::Acquire) {
                return false;
            }
            incoming.push(item);
        }
        self.shared.notify.notify_one();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

/// Consumer side, owned by the host.
pub struct EventQueue<E> {
    shared: Arc<Shared<E>>,
    draining: std::vec::IntoIter<E>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                incoming: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                notify: Notify::new(),
            }),
            draining: Vec::new().into_iter(),
        }
    }

    pub fn sender(&self) -> QueueSender<E> {
        QueueSender {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn push(&self, item: E) -> bool {
        self.sender().push(item)
    }

    /// Take up to `limit` items in insertion order (`None` takes all).
    ///
    /// A new batch is swapped in only once the previous one is exhausted, so
    /// items pushed mid-drain wait for a later call.
    pub fn drain_into(&mut self, limit: Option<usize>) -> Vec<E> {
        if self.draining.len() == 0 {
            let batch = std::mem::take(&mut *lock(&self.shared.incoming));
            self.draining = batch.into_iter();
        }
        match limit {
            Some(n) => self.draining.by_ref().take(n).collect(),
            None => self.draining.by_ref().collect(),
        }
    }

    /// Drop everything buffered on both sides of the swap.
    pub fn clear(&mut self) {
        lock(&self.shared.incoming).clear();
        self.draining = Vec::new().into_iter();
    }

    /// Reject further pushes and drop what is buffered. Not reversible.
    pub fn close(&mut self) {
        {
            let mut incoming = lock(&self.shared.incoming);
            self.shared.closed.store(true, Ordering::Release);
            incoming.clear();
        }
        self.draining = Vec::new().into_iter();
        self.shared.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.draining.len() + lock(&self.shared.incoming).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve once there is something to drain or the queue is closed.
    pub async fn notified(&self) {
        loop {
            if !self.is_empty() || self.is_closed() {
                return;
            }
            self.shared.notify.notified().await;
        }
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn drain_preserves_order() {
        let mut queue = EventQueue::new();
        for i in 0..5 {
            assert!(queue.push(i));
        }
        assert_eq!(queue.drain_into(None), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_with_limit_continues_batch() {
        let mut queue = EventQueue::new();
        for i in 0..3 {
            queue.push(i);
        }
        assert_eq!(queue.drain_into(Some(1)), vec![0]);

        // Pushed after the swap: must come after the rest of the current batch.
        queue.push(10);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain_into(Some(1)), vec![1]);
        assert_eq!(queue.drain_into(Some(1)), vec![2]);
        assert_eq!(queue.drain_into(Some(1)), vec![10]);
        assert!(queue.drain_into(Some(1)).is_empty());
    }

    #[test]
    fn clear_drops_both_buffers() {
        let mut queue = EventQueue::new();
        queue.push(1);
        queue.push(2);
        queue.drain_into(Some(1));
        queue.push(3);
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.drain_into(None).is_empty());
        assert!(queue.push(4));
    }

    #[test]
    fn closed_queue_rejects_pushes() {
        let mut queue = EventQueue::new();
        let sender = queue.sender();
        sender.push(1);
        queue.close();
        assert!(queue.is_empty());
        assert!(!sender.push(2));
        assert!(sender.is_closed());
        assert!(queue.drain_into(None).is_empty());
    }

    #[test]
    fn per_producer_order_across_threads() {
        let mut queue = EventQueue::new();
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let sender = queue.sender();
                thread::spawn(move || {
                    for i in 0..1000u32 {
                        sender.push((p, i));
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        let mut finished = false;
        while !finished {
            finished = producers.iter().all(|p| p.is_finished());
            seen.extend(queue.drain_into(Some(64)));
        }
        seen.extend(queue.drain_into(None));
        seen.extend(queue.drain_into(None));
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(seen.len(), 4000);
        for p in 0..4u32 {
            let order: Vec<u32> = seen.iter().filter(|(q, _)| *q == p).map(|(_, i)| *i).collect();
            assert_eq!(order, (0..1000).collect::<Vec<_>>());
        }
    }

    #[test]
    fn notified_is_ready_when_nonempty() {
        let queue = EventQueue::new();
        queue.push(1);
        assert!(queue.notified().now_or_never().is_some());
    }

    #[test]
    fn notified_is_pending_when_empty() {
        let queue: EventQueue<u8> = EventQueue::new();
        assert!(queue.notified().now_or_never().is_none());
    }

    #[tokio::test]
    async fn notified_wakes_on_foreign_push() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            sender.push("frame");
        });
        tokio::time::timeout(Duration::from_secs(2), queue.notified())
            .await
            .expect("push should wake the consumer");
        assert_eq!(queue.len(), 1);
        producer.join().unwrap();
    }
}
