//! Cross-boundary MPMC queues: the admission `InputQueue` and the
//! `OutputQueue` results flow back through (spec §4.6).
//!
//! Both are backed by a bounded `crossbeam-channel`, safe for multiple
//! producers and consumers. The "crossing the process boundary" language in
//! the spec refers to the logical envelope flow (task/result travel further
//! over the per-worker pipes too); within the parent process itself these
//! are plain in-memory MPMC channels.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Outcome of a bounded receive attempt, distinguishing an empty channel
/// from one that's been permanently abandoned.
pub enum RecvOutcome<T> {
    Item(T),
    Empty,
    Disconnected,
}

#[derive(Debug, Default)]
pub struct QueueMetrics {
    pub total_enqueued: AtomicU64,
    pub total_dequeued: AtomicU64,
    pub total_dropped: AtomicU64,
}

impl QueueMetrics {
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.total_enqueued.load(Ordering::Relaxed),
            self.total_dequeued.load(Ordering::Relaxed),
            self.total_dropped.load(Ordering::Relaxed),
        )
    }
}

/// A bounded MPMC envelope queue with enqueue/dequeue/drop counters.
pub struct Queue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    pub metrics: QueueMetrics,
}

impl<T> Queue<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            metrics: QueueMetrics::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(usize::MAX)
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Non-blocking push. Returns the item back on the `Err` side if the
    /// queue is full or disconnected.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        match self.sender.try_send(item) {
            Ok(()) => {
                self.metrics.total_enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => {
                self.metrics.total_dropped.fetch_add(1, Ordering::Relaxed);
                Err(item)
            }
        }
    }

    /// Block up to `timeout` for a free slot.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        match self.sender.send_timeout(item, timeout) {
            Ok(()) => {
                self.metrics.total_enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.metrics.total_dropped.fetch_add(1, Ordering::Relaxed);
                Err(e.into_inner())
            }
        }
    }

    /// Non-blocking pop.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.receiver.try_recv().ok();
        if item.is_some() {
            self.metrics.total_dequeued.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    /// Block up to `timeout` for an item. Used by dispatcher threads, both
    /// of which must periodically recheck a shutdown flag rather than block
    /// indefinitely (spec §5). Collapses "nothing ready" and "channel gone"
    /// into `None`; callers that must tell the two apart (the result
    /// collector, which treats a gone channel as the fatal "OutputQueue
    /// unreadable" case from spec §7) should use [`Queue::pop_timeout_checked`]
    /// instead.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.pop_timeout_checked(timeout) {
            RecvOutcome::Item(item) => Some(item),
            RecvOutcome::Empty | RecvOutcome::Disconnected => None,
        }
    }

    /// Like [`Queue::pop_timeout`], but distinguishes an empty-after-timeout
    /// receive from a channel whose every sender has been dropped — the
    /// latter means the queue is permanently unreadable, not merely empty.
    pub fn pop_timeout_checked(&self, timeout: Duration) -> RecvOutcome<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => {
                self.metrics.total_dequeued.fetch_add(1, Ordering::Relaxed);
                RecvOutcome::Item(item)
            }
            Err(RecvTimeoutError::Timeout) => RecvOutcome::Empty,
            Err(RecvTimeoutError::Disconnected) => RecvOutcome::Disconnected,
        }
    }

    /// A second handle sharing the same underlying channel, used to give the
    /// dispatcher threads and worker-process wiring their own `Sender`/`Receiver`
    /// without sharing a `&Queue` reference.
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    pub fn receiver(&self) -> Receiver<T> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let q: Queue<u32> = Queue::new(4);
        q.try_push(1).unwrap();
        q.try_push(2).unwrap();
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), None);
        let (enq, deq, drop) = q.metrics.snapshot();
        assert_eq!((enq, deq, drop), (2, 2, 0));
    }

    #[test]
    fn full_queue_reports_dropped() {
        let q: Queue<u32> = Queue::new(1);
        q.try_push(1).unwrap();
        assert_eq!(q.try_push(2), Err(2));
        let (_, _, dropped) = q.metrics.snapshot();
        assert_eq!(dropped, 1);
    }

    #[test]
    fn pop_timeout_returns_none_when_empty() {
        let q: Queue<u32> = Queue::new(1);
        assert_eq!(q.pop_timeout(Duration::from_millis(10)), None);
    }
}
