//! Pipeline counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters shared between the delivery side and the decode worker
#[derive(Debug)]
pub struct PipelineStats {
    /// Pipeline start time
    start_time: Instant,
    /// Items accepted by the queue
    samples_queued: AtomicU64,
    /// Samples handed to the decoder
    samples_decoded: AtomicU64,
    /// Samples that changed the track
    samples_applied: AtomicU64,
    /// Samples discarded by a stop, queued or in-flight
    samples_discarded: AtomicU64,
    /// Samples rejected at the delivery boundary
    samples_rejected: AtomicU64,
    /// Drain batches processed
    batches: AtomicU64,
    /// Track lock acquisitions by the worker
    lock_acquisitions: AtomicU64,
    /// Invalidation notifications sent
    invalidations: AtomicU64,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            samples_queued: AtomicU64::new(0),
            samples_decoded: AtomicU64::new(0),
            samples_applied: AtomicU64::new(0),
            samples_discarded: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            lock_acquisitions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn record_queued(&self) {
        self.samples_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one decoded sample and whether it changed the track
    pub fn record_decoded(&self, applied: bool) {
        self.samples_decoded.fetch_add(1, Ordering::Relaxed);
        if applied {
            self.samples_applied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_discarded(&self, count: usize) {
        self.samples_discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one drain batch, which holds the track lock once
    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in milliseconds
    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_ms: self.uptime_ms(),
            samples_queued: self.samples_queued.load(Ordering::Relaxed),
            samples_decoded: self.samples_decoded.load(Ordering::Relaxed),
            samples_applied: self.samples_applied.load(Ordering::Relaxed),
            samples_discarded: self.samples_discarded.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            lock_acquisitions: self.lock_acquisitions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_ms: u64,
    pub samples_queued: u64,
    pub samples_decoded: u64,
    pub samples_applied: u64,
    pub samples_discarded: u64,
    pub samples_rejected: u64,
    pub batches: u64,
    pub lock_acquisitions: u64,
    pub invalidations: u64,
}
