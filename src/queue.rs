//! Sample queue between the delivery thread and the decode worker
//!
//! The producer appends samples without blocking; the single consumer waits
//! until something is pending and then takes the whole backlog at once so
//! the track lock is acquired once per batch instead of once per sample.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::sample::QueueItem;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    /// Terminal
    shutdown_requested: bool,
}

impl QueueState {
    /// Single wake-up predicate for the consumer
    fn is_ready(&self) -> bool {
        !self.items.is_empty() || self.shutdown_requested
    }
}

/// Items removed from the queue in one consumer wake-up.
#[derive(Debug)]
pub struct Batch {
    pub items: Vec<QueueItem>,
    /// Stop epoch at the time the batch was taken
    pub epoch: u64,
}

/// Outcome of [`IngestQueue::wait_and_drain`].
#[derive(Debug)]
pub enum Drain {
    /// Pending items, in arrival order
    Batch(Batch),
    /// Shutdown was requested and nothing is left to process
    Shutdown,
}

/// Unbounded FIFO with an end-of-stream marker and stop/shutdown signalling.
#[derive(Debug, Default)]
pub struct IngestQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
    /// Bumped by every `request_stop`; lets the worker abandon a batch it
    /// took before the stop
    stop_epoch: AtomicU64,
}

impl IngestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and wake the consumer.
    ///
    /// Returns `false` (and drops the item) once shutdown has been requested.
    pub fn push(&self, item: impl Into<QueueItem>) -> bool {
        let item = item.into();
        let mut state = self.state.lock();
        if state.shutdown_requested {
            drop(state);
            tracing::warn!("ingest queue: push after shutdown ignored");
            return false;
        }
        state.items.push_back(item);
        drop(state);

        self.ready.notify_one();
        true
    }

    /// Block until items are pending or shutdown is signalled, then take the
    /// entire backlog.
    ///
    /// Items queued before a shutdown are still handed out; `Drain::Shutdown`
    /// is returned only once the queue is empty.
    pub fn wait_and_drain(&self) -> Drain {
        let mut state = self.state.lock();
        while !state.is_ready() {
            self.ready.wait(&mut state);
        }

        if state.items.is_empty() {
            return Drain::Shutdown;
        }

        let items: Vec<QueueItem> = state.items.drain(..).collect();
        Drain::Batch(Batch {
            items,
            epoch: self.stop_epoch.load(Ordering::Acquire),
        })
    }

    /// Discard everything queued without decoding it.
    ///
    /// The queue is emptied and the stop epoch bumped under the queue lock,
    /// so the consumer never wakes for a stop; it only sees a batch taken
    /// earlier turn stale. Safe to call from any thread and idempotent.
    /// Returns the number of discarded items.
    pub fn request_stop(&self) -> usize {
        let mut state = self.state.lock();
        let discarded = state.items.len();
        state.items.clear();
        self.stop_epoch.fetch_add(1, Ordering::AcqRel);
        drop(state);

        if discarded > 0 {
            tracing::debug!(discarded, "ingest queue: pending samples discarded");
        }
        discarded
    }

    /// Permanently stop accepting items and wake the consumer.
    pub fn request_shutdown(&self) {
        self.state.lock().shutdown_requested = true;
        self.ready.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown_requested
    }

    /// True if a stop happened after `epoch` was observed
    pub fn is_stale(&self, epoch: u64) -> bool {
        self.stop_epoch.load(Ordering::Acquire) != epoch
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleEnvelope;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn sample(start: i64) -> SampleEnvelope {
        SampleEnvelope::from_slice(start, Some(start + 10), b"x")
    }

    fn expect_batch(drain: Drain) -> Batch {
        match drain {
            Drain::Batch(batch) => batch,
            other => panic!("expected a batch, got {:?}", other),
        }
    }

    #[test]
    fn test_drain_takes_everything_in_order() {
        let queue = IngestQueue::new();
        queue.push(sample(1));
        queue.push(QueueItem::EndOfStream);
        queue.push(sample(2));

        let batch = expect_batch(queue.wait_and_drain());
        assert_eq!(batch.items.len(), 3);
        assert!(matches!(&batch.items[0], QueueItem::Sample(s) if s.start() == 1));
        assert!(matches!(batch.items[1], QueueItem::EndOfStream));
        assert!(matches!(&batch.items[2], QueueItem::Sample(s) if s.start() == 2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_request_stop_discards_pending() {
        let queue = IngestQueue::new();
        for i in 0..5 {
            queue.push(sample(i));
        }

        assert_eq!(queue.request_stop(), 5);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.request_stop(), 0);
    }

    #[test]
    fn test_stop_marks_taken_batch_stale() {
        let queue = IngestQueue::new();
        queue.push(sample(0));
        let batch = expect_batch(queue.wait_and_drain());

        assert!(!queue.is_stale(batch.epoch));
        queue.request_stop();
        assert!(queue.is_stale(batch.epoch));
    }

    #[test]
    fn test_stop_leaves_consumer_waiting() {
        let queue = Arc::new(IngestQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || expect_batch(queue.wait_and_drain()))
        };

        thread::sleep(Duration::from_millis(20));
        queue.request_stop();
        thread::sleep(Duration::from_millis(20));
        assert!(!consumer.is_finished());

        queue.push(sample(7));
        let batch = consumer.join().unwrap();
        assert_eq!(batch.items.len(), 1);
        assert!(!queue.is_stale(batch.epoch));
    }

    #[test]
    fn test_shutdown_still_hands_out_pending_items() {
        let queue = IngestQueue::new();
        queue.push(sample(0));
        queue.push(sample(1));
        queue.request_shutdown();

        let batch = expect_batch(queue.wait_and_drain());
        assert_eq!(batch.items.len(), 2);
        assert!(matches!(queue.wait_and_drain(), Drain::Shutdown));
    }

    #[test]
    fn test_push_after_shutdown_is_ignored() {
        let queue = IngestQueue::new();
        queue.request_shutdown();

        assert!(!queue.push(sample(0)));
        assert!(queue.is_empty());
        assert!(queue.is_shutdown());
    }

    #[test]
    fn test_shutdown_wakes_blocked_consumer() {
        let queue = Arc::new(IngestQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || matches!(queue.wait_and_drain(), Drain::Shutdown))
        };

        thread::sleep(Duration::from_millis(20));
        queue.request_shutdown();
        assert!(consumer.join().unwrap());
    }

    #[test]
    fn test_push_wakes_blocked_consumer() {
        let queue = Arc::new(IngestQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || expect_batch(queue.wait_and_drain()).items.len())
        };

        thread::sleep(Duration::from_millis(20));
        queue.push(sample(3));
        assert_eq!(consumer.join().unwrap(), 1);
    }
}
