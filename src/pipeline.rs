//! Subtitle ingest pipeline
//!
//! [`SubtitlePipeline`] owns the ingest queue and the decode worker thread
//! for one subtitle stream. Upstream data enters through a [`Delivery`]
//! handle (or [`SubtitlePipeline::push`]); the worker thread is joined on
//! every teardown path, including drop.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

use crate::config::{PipelineConfig, SubtitleFormat};
use crate::decoder::{FormatDecoder, TimeBase};
use crate::error::{IngestError, Result};
use crate::queue::IngestQueue;
use crate::sample::{ImageHandle, QueueItem, SampleEnvelope, SampleTimes, Timestamp};
use crate::sink::InvalidationSink;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::track::{Segment, SubtitleTrackStore, TrackHandle};

/// State shared between the pipeline and its delivery handles
#[derive(Debug)]
struct Shared {
    /// Replaced on reconfigure
    queue: RwLock<Arc<IngestQueue>>,
    format: RwLock<SubtitleFormat>,
    /// Start of the current segment, added to upstream sample times
    segment_start: AtomicI64,
    stats: Arc<PipelineStats>,
}

impl Shared {
    fn queue(&self) -> Arc<IngestQueue> {
        Arc::clone(&self.queue.read())
    }

    fn push(&self, item: QueueItem) -> bool {
        let accepted = self.queue().push(item);
        if accepted {
            self.stats.record_queued();
        }
        accepted
    }

    fn request_stop(&self) -> usize {
        let discarded = self.queue().request_stop();
        self.stats.record_discarded(discarded);
        discarded
    }

    fn reject(&self, reason: &'static str) -> bool {
        tracing::debug!(reason, "sample rejected at delivery");
        self.stats.record_rejected();
        false
    }
}

/// Producer-side handle that adapts raw upstream samples into envelopes.
///
/// Cloneable and `Send`; intended for the single delivery thread.
#[derive(Debug, Clone)]
pub struct Delivery {
    shared: Arc<Shared>,
}

impl Delivery {
    /// Deliver a byte payload. The bytes are copied.
    ///
    /// Returns `false` if the sample was dropped: empty payload, unset
    /// start or stop time, or the pipeline is shutting down.
    pub fn receive(&self, times: SampleTimes, data: &[u8]) -> bool {
        if data.is_empty() {
            return self.shared.reject("empty payload");
        }

        let (start, stop) = times.resolve(self.shared.segment_start.load(Ordering::Acquire));
        let (Some(start), Some(stop)) = (start, stop) else {
            return self.shared.reject("sample time unset");
        };

        tracing::trace!(start, stop, len = data.len(), "byte sample received");
        self.shared
            .push(SampleEnvelope::from_slice(start, Some(stop), data).into())
    }

    /// Deliver an externally owned image buffer.
    ///
    /// Any sample times are accepted; an unset start becomes `0`.
    pub fn receive_image(&self, times: SampleTimes, image: ImageHandle) -> bool {
        let format = *self.shared.format.read();
        if !format.uses_image_handle() {
            return self.shared.reject("image buffer on a byte-payload stream");
        }

        let (start, stop) = times.resolve(self.shared.segment_start.load(Ordering::Acquire));
        let start = start.unwrap_or(0);

        tracing::trace!(start, ?stop, "image sample received");
        self.shared
            .push(SampleEnvelope::from_image(start, stop, image).into())
    }

    pub fn end_of_stream(&self) -> bool {
        tracing::debug!("end of stream");
        self.shared.push(QueueItem::EndOfStream)
    }
}

/// One subtitle stream: ingest queue, decode worker and track binding.
pub struct SubtitlePipeline<S, K>
where
    S: SubtitleTrackStore,
    K: InvalidationSink<S>,
{
    id: Uuid,
    config: PipelineConfig,
    store: Arc<S>,
    sink: Arc<K>,
    stats: Arc<PipelineStats>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl<S, K> SubtitlePipeline<S, K>
where
    S: SubtitleTrackStore,
    K: InvalidationSink<S>,
{
    /// Validate `config`, name the track and start the decode worker.
    pub fn new(config: PipelineConfig, store: Arc<S>, sink: Arc<K>) -> Result<Self> {
        config.validate()?;

        let id = Uuid::new_v4();
        let stats = Arc::new(PipelineStats::new());
        let queue = Arc::new(IngestQueue::new());
        let shared = Arc::new(Shared {
            queue: RwLock::new(Arc::clone(&queue)),
            format: RwLock::new(config.format),
            segment_start: AtomicI64::new(0),
            stats: Arc::clone(&stats),
        });

        let name = config.track_name();
        store.with_lock(|track| track.set_name(name.clone()));

        let mut pipeline = Self {
            id,
            config,
            store,
            sink,
            stats,
            shared,
            worker: None,
        };
        pipeline.worker = Some(pipeline.spawn_worker(queue)?);

        tracing::info!(
            pipeline = %id,
            format = pipeline.config.format.name(),
            track = %name,
            "subtitle pipeline started"
        );
        Ok(pipeline)
    }

    fn spawn_worker(&self, queue: Arc<IngestQueue>) -> Result<JoinHandle<()>> {
        let decoder = FormatDecoder::new(self.config.format, TimeBase::new(self.config.ticks_per_ms));
        let worker = crate::worker::DecodeWorker::new(
            self.id,
            queue,
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            decoder,
            Arc::clone(&self.stats),
        );

        thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|e| {
                tracing::warn!(pipeline = %self.id, error = %e, "failed to spawn decode worker");
                IngestError::Io(e)
            })
    }

    /// Signal shutdown and join the worker. Idempotent.
    fn stop_worker(&mut self) {
        self.shared.queue().request_shutdown();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!(pipeline = %self.id, "decode worker panicked");
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Handle for the delivery thread
    pub fn delivery(&self) -> Delivery {
        Delivery {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Enqueue an envelope or end-of-stream marker without adaptation.
    ///
    /// Times must already be in the pipeline time base.
    pub fn push(&self, item: impl Into<QueueItem>) -> bool {
        self.shared.push(item.into())
    }

    /// Discard all pending samples without decoding them.
    ///
    /// A batch the worker is already decoding is abandoned at the next
    /// sample. Returns the number of discarded queued items.
    pub fn request_stop(&self) -> usize {
        let discarded = self.shared.request_stop();
        tracing::debug!(pipeline = %self.id, discarded, "stop requested");
        discarded
    }

    /// Stop accepting samples; pending ones are still decoded.
    ///
    /// The worker is joined by [`shutdown`](Self::shutdown) or on drop.
    pub fn request_shutdown(&self) {
        self.shared.queue().request_shutdown();
    }

    /// Start a new segment: pending samples are discarded, later sample
    /// times are offset by `start` and the track is reset.
    pub fn new_segment(&self, start: Timestamp, stop: Timestamp, rate: f64) {
        let discarded = self.shared.request_stop();
        self.shared.segment_start.store(start, Ordering::Release);

        let segment = Segment { start, stop, rate };
        self.store.with_lock(|track| track.new_segment(segment));

        tracing::info!(pipeline = %self.id, start, stop, rate, discarded, "new segment");
    }

    /// Switch to a new configuration.
    ///
    /// Pending samples are discarded, the worker is joined, the track is
    /// cleared and renamed, and a fresh queue and worker are started.
    pub fn reconfigure(&mut self, config: PipelineConfig) -> Result<()> {
        config.validate()?;

        let discarded = self.shared.request_stop();
        self.stop_worker();

        let queue = Arc::new(IngestQueue::new());
        *self.shared.queue.write() = Arc::clone(&queue);
        *self.shared.format.write() = config.format;
        self.shared.segment_start.store(0, Ordering::Release);

        let name = config.track_name();
        self.store.with_lock(|track| {
            track.clear();
            track.set_name(name.clone());
        });
        self.config = config;

        match self.spawn_worker(Arc::clone(&queue)) {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                queue.request_shutdown();
                return Err(e);
            }
        }

        tracing::info!(
            pipeline = %self.id,
            format = self.config.format.name(),
            track = %name,
            discarded,
            "subtitle pipeline reconfigured"
        );
        Ok(())
    }

    /// Items waiting for the worker
    pub fn queue_len(&self) -> usize {
        self.shared.queue().len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Decode everything still queued, then join the worker.
    pub fn shutdown(mut self) -> StatsSnapshot {
        self.stop_worker();
        let stats = self.stats.snapshot();
        tracing::info!(
            pipeline = %self.id,
            decoded = stats.samples_decoded,
            invalidations = stats.invalidations,
            "subtitle pipeline stopped"
        );
        stats
    }
}

impl<S, K> Drop for SubtitlePipeline<S, K>
where
    S: SubtitleTrackStore,
    K: InvalidationSink<S>,
{
    fn drop(&mut self) {
        self.stop_worker();
    }
}
