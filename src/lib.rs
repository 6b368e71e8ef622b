pub(crate) mod config;
pub(crate) mod config_file;
pub mod decoder;
pub(crate) mod error;
pub(crate) mod pipeline;
pub(crate) mod queue;
pub(crate) mod sample;
pub(crate) mod sink;
pub(crate) mod stats;
pub(crate) mod track;
pub(crate) mod worker;

#[cfg(test)]
pub(crate) mod tests;

pub use config::{language_name, AssFieldCount, PipelineConfig, SubtitleFormat};
pub use config_file::{ConfigFile, LoggingSettings, PipelineSettings, TrackSettings};
pub use decoder::{FormatDecoder, TimeBase};
pub use error::{IngestError, Result};
pub use pipeline::{Delivery, SubtitlePipeline};
pub use queue::{Batch, Drain, IngestQueue};
pub use sample::{ImageHandle, MediaBuffer, Payload, QueueItem, SampleEnvelope, SampleTimes, Timestamp};
pub use sink::{InvalidationSink, NullSink, RecordingSink};
pub use stats::{PipelineStats, StatsSnapshot};
pub use track::{
    ImagePacket, Margins, MemoryTrack, MemoryTrackStore, Segment, SubtitleEntry, SubtitleTrackStore, TimedText,
    TrackHandle, TrackSummary,
};
pub use worker::{BatchOutcome, DecodeWorker};
