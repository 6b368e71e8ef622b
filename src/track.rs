//! Subtitle track store boundary
//!
//! The store that owns parsed entries is external to the pipeline. It is
//! reached only through [`SubtitleTrackStore::with_lock`], which hands the
//! decoder a [`TrackHandle`] for the duration of one scoped acquisition.
//! [`MemoryTrackStore`] is a plain in-memory implementation used by the
//! replay binary and the tests.

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::sample::{ImageHandle, Timestamp};

/// Margin override of a styled entry, in script pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Margins {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// A parsed text subtitle entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleEntry {
    /// Start time in milliseconds
    pub start_ms: i64,
    /// End time in milliseconds
    pub stop_ms: i64,
    /// Text content (may contain SSA override tags)
    pub text: String,
    pub style: Option<String>,
    pub actor: Option<String>,
    pub effect: Option<String>,
    pub margins: Option<Margins>,
    pub layer: Option<i32>,
    pub read_order: Option<i32>,
}

impl SubtitleEntry {
    /// Create an unstyled entry
    pub fn new(start_ms: i64, stop_ms: i64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            stop_ms,
            text: text.into(),
            style: None,
            actor: None,
            effect: None,
            margins: None,
            layer: None,
            read_order: None,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.stop_ms - self.start_ms
    }
}

/// Timed fragment for the structured-renderer container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedText {
    pub start: Timestamp,
    pub stop: Timestamp,
    pub text: String,
}

/// Byte-payload image packet (VobSub)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePacket {
    pub start: Timestamp,
    pub stop: Option<Timestamp>,
    pub data: Bytes,
}

/// Segment boundary announced by the upstream source
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: Timestamp,
    pub stop: Timestamp,
    pub rate: f64,
}

/// Mutation capability over one subtitle track.
///
/// Only obtainable through [`SubtitleTrackStore::with_lock`].
pub trait TrackHandle {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// Append one text entry; ordering is the store's concern
    fn append_entry(&mut self, entry: SubtitleEntry);

    /// Replace the whole track content
    fn replace_all(&mut self, entries: Vec<SubtitleEntry>);

    fn append_timed_text(&mut self, text: TimedText);

    /// Forward one compressed image update verbatim
    fn append_image_update(&mut self, image: ImageHandle);

    fn append_image_packet(&mut self, packet: ImagePacket);

    /// Reset the track for a new stream segment
    fn new_segment(&mut self, segment: Segment);

    /// Drop all content and segment information; the name is kept
    fn clear(&mut self);
}

/// External owner of a subtitle track and its lock.
pub trait SubtitleTrackStore: Send + Sync + 'static {
    type Handle: TrackHandle;

    /// Run `f` with the track lock held
    fn with_lock<T>(&self, f: impl FnOnce(&mut Self::Handle) -> T) -> T;
}

/// In-memory subtitle track
#[derive(Debug, Clone, Default)]
pub struct MemoryTrack {
    pub name: String,
    pub entries: Vec<SubtitleEntry>,
    pub timed_text: Vec<TimedText>,
    pub images: Vec<ImageHandle>,
    pub image_packets: Vec<ImagePacket>,
    pub segment: Option<Segment>,
}

impl MemoryTrack {
    /// Entries in presentation order (start time, then read order)
    pub fn sorted_entries(&self) -> Vec<SubtitleEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| (e.start_ms, e.read_order.unwrap_or(0)));
        entries
    }

    pub fn summary(&self) -> TrackSummary {
        TrackSummary {
            name: self.name.clone(),
            entries: self.sorted_entries(),
            timed_text: self.timed_text.clone(),
            image_updates: self.images.len(),
            image_packets: self.image_packets.len(),
            segment: self.segment,
        }
    }
}

impl TrackHandle for MemoryTrack {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn append_entry(&mut self, entry: SubtitleEntry) {
        self.entries.push(entry);
    }

    fn replace_all(&mut self, entries: Vec<SubtitleEntry>) {
        self.entries = entries;
    }

    fn append_timed_text(&mut self, text: TimedText) {
        self.timed_text.push(text);
    }

    fn append_image_update(&mut self, image: ImageHandle) {
        self.images.push(image);
    }

    fn append_image_packet(&mut self, packet: ImagePacket) {
        self.image_packets.push(packet);
    }

    fn new_segment(&mut self, segment: Segment) {
        self.entries.clear();
        self.timed_text.clear();
        self.images.clear();
        self.image_packets.clear();
        self.segment = Some(segment);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.timed_text.clear();
        self.images.clear();
        self.image_packets.clear();
        self.segment = None;
    }
}

/// Serializable view of a [`MemoryTrack`]
#[derive(Debug, Clone, Serialize)]
pub struct TrackSummary {
    pub name: String,
    pub entries: Vec<SubtitleEntry>,
    pub timed_text: Vec<TimedText>,
    pub image_updates: usize,
    pub image_packets: usize,
    pub segment: Option<Segment>,
}

/// Mutex-guarded [`MemoryTrack`] that counts lock acquisitions
#[derive(Debug, Default)]
pub struct MemoryTrackStore {
    track: Mutex<MemoryTrack>,
    lock_count: AtomicUsize,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current track content
    pub fn snapshot(&self) -> MemoryTrack {
        self.track.lock().clone()
    }

    /// Number of `with_lock` acquisitions so far
    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::Relaxed)
    }
}

impl SubtitleTrackStore for MemoryTrackStore {
    type Handle = MemoryTrack;

    fn with_lock<T>(&self, f: impl FnOnce(&mut MemoryTrack) -> T) -> T {
        let mut track = self.track.lock();
        self.lock_count.fetch_add(1, Ordering::Relaxed);
        f(&mut track)
    }
}
