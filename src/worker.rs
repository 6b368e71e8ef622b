//! Decode worker
//!
//! The consumer side of the ingest queue. Each wake-up takes the whole
//! backlog, decodes it under a single track-lock acquisition and reports the
//! earliest changed presentation time once the lock has been released.

use std::sync::Arc;
use uuid::Uuid;

use crate::decoder::FormatDecoder;
use crate::queue::{Batch, Drain, IngestQueue};
use crate::sample::{QueueItem, Timestamp};
use crate::sink::InvalidationSink;
use crate::stats::PipelineStats;
use crate::track::SubtitleTrackStore;

/// Result of processing one drain batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Samples handed to the decoder
    pub decoded: usize,
    /// Samples skipped because a stop arrived mid-batch
    pub abandoned: usize,
    /// Earliest presentation time changed by the batch
    pub invalidate_from: Option<Timestamp>,
}

pub struct DecodeWorker<S, K> {
    id: Uuid,
    queue: Arc<IngestQueue>,
    store: Arc<S>,
    sink: Arc<K>,
    decoder: FormatDecoder,
    stats: Arc<PipelineStats>,
}

impl<S, K> DecodeWorker<S, K>
where
    S: SubtitleTrackStore,
    K: InvalidationSink<S>,
{
    pub fn new(
        id: Uuid,
        queue: Arc<IngestQueue>,
        store: Arc<S>,
        sink: Arc<K>,
        decoder: FormatDecoder,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            id,
            queue,
            store,
            sink,
            decoder,
            stats,
        }
    }

    /// Consumer loop; returns once shutdown is requested and the queue is empty.
    pub fn run(self) {
        let span = tracing::info_span!(
            "decode_worker",
            pipeline = %self.id,
            format = self.decoder.format().name()
        );
        let _enter = span.enter();
        tracing::debug!("decode worker started");

        loop {
            match self.queue.wait_and_drain() {
                Drain::Batch(batch) => {
                    self.process_batch(batch);
                }
                Drain::Shutdown => break,
            }
        }

        tracing::debug!("decode worker exiting");
    }

    /// Decode one batch in arrival order and notify the sink.
    pub fn process_batch(&self, batch: Batch) -> BatchOutcome {
        let Batch { items, epoch } = batch;
        let total = items.len();

        let outcome = self.store.with_lock(|track| {
            let mut outcome = BatchOutcome::default();

            for (index, item) in items.iter().enumerate() {
                if self.queue.is_stale(epoch) {
                    outcome.abandoned = items[index..]
                        .iter()
                        .filter(|item| matches!(item, QueueItem::Sample(_)))
                        .count();
                    break;
                }

                match item {
                    QueueItem::EndOfStream => tracing::trace!("end of stream marker"),
                    QueueItem::Sample(envelope) => {
                        let changed = self.decoder.decode(envelope, track);
                        tracing::trace!(start = envelope.start(), changed = changed.is_some(), "sample decoded");
                        self.stats.record_decoded(changed.is_some());
                        outcome.decoded += 1;

                        if let Some(at) = changed {
                            outcome.invalidate_from = Some(outcome.invalidate_from.map_or(at, |min| min.min(at)));
                        }
                    }
                }
            }

            outcome
        });
        self.stats.record_batch();

        if outcome.abandoned > 0 {
            self.stats.record_discarded(outcome.abandoned);
            tracing::debug!(abandoned = outcome.abandoned, "stop during batch, remaining samples dropped");
        }

        tracing::debug!(
            items = total,
            decoded = outcome.decoded,
            invalidate_from = ?outcome.invalidate_from,
            "batch processed"
        );

        if let Some(at) = outcome.invalidate_from {
            self.sink.invalidate(at, self.store.as_ref());
            self.stats.record_invalidation();
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubtitleFormat;
    use crate::decoder::TimeBase;
    use crate::sample::SampleEnvelope;
    use crate::sink::RecordingSink;
    use crate::track::MemoryTrackStore;

    type TestWorker = DecodeWorker<MemoryTrackStore, RecordingSink>;

    fn worker(queue: Arc<IngestQueue>) -> (TestWorker, Arc<MemoryTrackStore>, Arc<RecordingSink>) {
        let store = Arc::new(MemoryTrackStore::new());
        let sink = Arc::new(RecordingSink::new());
        let worker = DecodeWorker::new(
            Uuid::new_v4(),
            queue,
            Arc::clone(&store),
            Arc::clone(&sink),
            FormatDecoder::new(SubtitleFormat::Utf8Line, TimeBase::new(1)),
            Arc::new(PipelineStats::new()),
        );
        (worker, store, sink)
    }

    fn text(start: i64, text: &str) -> QueueItem {
        SampleEnvelope::from_slice(start, Some(start + 100), text.as_bytes()).into()
    }

    #[test]
    fn test_batch_locks_once_and_invalidates_at_min() {
        let queue = Arc::new(IngestQueue::new());
        let (worker, store, sink) = worker(Arc::clone(&queue));

        let batch = Batch {
            items: vec![text(300, "c"), text(100, "a"), QueueItem::EndOfStream, text(200, "b")],
            epoch: 0,
        };
        let outcome = worker.process_batch(batch);

        assert_eq!(outcome.decoded, 3);
        assert_eq!(outcome.invalidate_from, Some(100));
        assert_eq!(store.lock_count(), 1);
        assert_eq!(sink.calls(), vec![100]);

        // arrival order, not timestamp order
        let texts: Vec<String> = store.snapshot().entries.into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_batch_without_changes_does_not_invalidate() {
        let queue = Arc::new(IngestQueue::new());
        let (worker, store, sink) = worker(queue);

        let outcome = worker.process_batch(Batch {
            items: vec![text(0, "   "), QueueItem::EndOfStream],
            epoch: 0,
        });

        assert_eq!(outcome.invalidate_from, None);
        assert!(sink.calls().is_empty());
        assert!(store.snapshot().entries.is_empty());
    }

    #[test]
    fn test_stale_batch_is_abandoned() {
        let queue = Arc::new(IngestQueue::new());
        let (worker, store, sink) = worker(Arc::clone(&queue));

        queue.push(text(0, "stale"));
        queue.push(text(10, "stale too"));
        let batch = match queue.wait_and_drain() {
            Drain::Batch(batch) => batch,
            other => panic!("expected a batch, got {:?}", other),
        };
        queue.request_stop();

        let outcome = worker.process_batch(batch);
        assert_eq!(outcome.decoded, 0);
        assert_eq!(outcome.abandoned, 2);
        assert!(store.snapshot().entries.is_empty());
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_run_exits_after_draining_on_shutdown() {
        let queue = Arc::new(IngestQueue::new());
        let (worker, store, sink) = worker(Arc::clone(&queue));

        queue.push(text(50, "one"));
        queue.push(text(20, "two"));
        queue.request_shutdown();
        worker.run();

        assert_eq!(store.snapshot().entries.len(), 2);
        assert_eq!(sink.calls(), vec![20]);
    }
}
