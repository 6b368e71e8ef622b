//! Timestamped subtitle samples
//!
//! A [`SampleEnvelope`] is one unit of upstream subtitle data together with
//! its presentation time range. Byte payloads are copied into the envelope
//! so they outlive the delivery buffer; image payloads are shared handles
//! whose backing storage is owned by the delivery system.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

use crate::error::{IngestError, Result};

/// Presentation time in pipeline ticks (100 ns by default).
pub type Timestamp = i64;

/// Backing storage of an externally owned media buffer.
///
/// Implemented by the delivery system for whatever buffer type it receives
/// image subtitles in. The buffer stays alive for as long as any
/// [`ImageHandle`] refers to it.
pub trait MediaBuffer: Send + Sync + fmt::Debug {
    /// Compressed image data carried by the buffer
    fn as_bytes(&self) -> &[u8];
}

impl MediaBuffer for Bytes {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

impl MediaBuffer for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

/// Shared handle to an externally owned image update buffer.
#[derive(Clone, Debug)]
pub struct ImageHandle(Arc<dyn MediaBuffer>);

impl ImageHandle {
    pub fn new(buffer: Arc<dyn MediaBuffer>) -> Self {
        Self(buffer)
    }

    pub fn from_buffer<B: MediaBuffer + 'static>(buffer: B) -> Self {
        Self(Arc::new(buffer))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns true when both handles refer to the same buffer
    pub fn ptr_eq(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Payload carried by an envelope: exactly one of the two variants.
#[derive(Clone, Debug)]
pub enum Payload {
    Bytes(Bytes),
    Image(ImageHandle),
}

/// One timestamped unit of incoming subtitle data.
#[derive(Clone, Debug)]
pub struct SampleEnvelope {
    start: Timestamp,
    stop: Option<Timestamp>,
    payload: Payload,
}

impl SampleEnvelope {
    /// Create an envelope that owns a copy of `data`
    pub fn from_slice(start: Timestamp, stop: Option<Timestamp>, data: &[u8]) -> Self {
        Self::from_bytes(start, stop, Bytes::copy_from_slice(data))
    }

    pub fn from_bytes(start: Timestamp, stop: Option<Timestamp>, data: Bytes) -> Self {
        Self {
            start,
            stop,
            payload: Payload::Bytes(data),
        }
    }

    pub fn from_image(start: Timestamp, stop: Option<Timestamp>, image: ImageHandle) -> Self {
        Self {
            start,
            stop,
            payload: Payload::Image(image),
        }
    }

    /// Build an envelope from optional payload parts.
    ///
    /// Exactly one of `data` and `image` must be present.
    pub fn try_new(
        start: Timestamp,
        stop: Option<Timestamp>,
        data: Option<Bytes>,
        image: Option<ImageHandle>,
    ) -> Result<Self> {
        match (data, image) {
            (Some(data), None) => Ok(Self::from_bytes(start, stop, data)),
            (None, Some(image)) => Ok(Self::from_image(start, stop, image)),
            (None, None) => Err(IngestError::EmptyEnvelope),
            (Some(_), Some(_)) => Err(IngestError::AmbiguousEnvelope),
        }
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn stop(&self) -> Option<Timestamp> {
        self.stop
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Byte payload, if this is not an image envelope
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(data) => Some(&data[..]),
            Payload::Image(_) => None,
        }
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        match &self.payload {
            Payload::Image(image) => Some(image),
            Payload::Bytes(_) => None,
        }
    }
}

/// An entry in the ingest queue.
#[derive(Clone, Debug)]
pub enum QueueItem {
    Sample(SampleEnvelope),
    EndOfStream,
}

impl From<SampleEnvelope> for QueueItem {
    fn from(envelope: SampleEnvelope) -> Self {
        QueueItem::Sample(envelope)
    }
}

/// Time information as reported by the upstream source for one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleTimes {
    Both(Timestamp, Timestamp),
    StartOnly(Timestamp),
    Unset,
}

impl SampleTimes {
    /// Shift the reported times by the current segment start.
    pub fn resolve(self, segment_start: Timestamp) -> (Option<Timestamp>, Option<Timestamp>) {
        match self {
            SampleTimes::Both(start, stop) => (
                Some(start.saturating_add(segment_start)),
                Some(stop.saturating_add(segment_start)),
            ),
            SampleTimes::StartOnly(start) => (Some(start.saturating_add(segment_start)), None),
            SampleTimes::Unset => (None, None),
        }
    }
}
