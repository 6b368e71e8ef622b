//! Test fixtures for pipeline scenarios

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{PipelineConfig, SubtitleFormat};
use crate::sink::InvalidationSink;
use crate::track::{MemoryTrack, MemoryTrackStore, SubtitleTrackStore};
use crate::SubtitlePipeline;

/// Track store whose lock can be held by the test to park the worker
/// right after it has drained a batch
#[derive(Debug, Default)]
pub struct GatedStore {
    gate: Mutex<()>,
    pub inner: MemoryTrackStore,
}

impl GatedStore {
    pub fn hold(&self) -> MutexGuard<'_, ()> {
        self.gate.lock()
    }

    /// True while some `with_lock` call (or `hold`) is active
    pub fn is_locked(&self) -> bool {
        self.gate.is_locked()
    }

    pub fn snapshot(&self) -> MemoryTrack {
        self.inner.snapshot()
    }
}

impl SubtitleTrackStore for GatedStore {
    type Handle = MemoryTrack;

    fn with_lock<T>(&self, f: impl FnOnce(&mut MemoryTrack) -> T) -> T {
        let _gate = self.gate.lock();
        self.inner.with_lock(f)
    }
}

/// Pipeline config with a 1 tick = 1 ms time base
pub fn ms_config(format: SubtitleFormat) -> PipelineConfig {
    let mut config = PipelineConfig::with_format(format);
    config.ticks_per_ms = 1;
    config
}

pub fn gated_pipeline<K>(format: SubtitleFormat, sink: Arc<K>) -> (SubtitlePipeline<GatedStore, K>, Arc<GatedStore>)
where
    K: InvalidationSink<GatedStore>,
{
    let store = Arc::new(GatedStore::default());
    let pipeline = SubtitlePipeline::new(ms_config(format), Arc::clone(&store), sink).unwrap();
    (pipeline, store)
}

/// Poll until the worker has taken everything from the queue
pub fn wait_until_drained<S, K>(pipeline: &SubtitlePipeline<S, K>)
where
    S: SubtitleTrackStore,
    K: InvalidationSink<S>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while pipeline.queue_len() > 0 {
        assert!(Instant::now() < deadline, "worker did not drain the queue");
        thread::sleep(Duration::from_millis(1));
    }
}

pub fn wide(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// GAB1 record with a 16-bit size; the body is zero-padded to `size`
pub fn gab1_record(tag: u16, size: u16, mut body: Vec<u8>) -> Vec<u8> {
    body.resize(size as usize, 0);
    let mut out = tag.to_le_bytes().to_vec();
    out.extend_from_slice(&size.to_le_bytes());
    out.extend(body);
    out
}

pub fn gab1_payload(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"GAB1\0".to_vec();
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

pub fn entry_body(start_ms: i32, stop_ms: i32, text: Vec<u8>) -> Vec<u8> {
    let mut body = start_ms.to_le_bytes().to_vec();
    body.extend_from_slice(&stop_ms.to_le_bytes());
    body.extend(text);
    body
}
