//! Format decoding
//!
//! [`FormatDecoder`] parses one sample according to the configured
//! [`SubtitleFormat`] and applies the result to the track. Each format is an
//! independent grammar implemented as a free function with the same
//! signature; none of them keep state between samples.

pub mod ass;
pub mod gab;
pub mod ssa;
pub mod subrip;
pub mod text;
pub mod webvtt;

use crate::config::SubtitleFormat;
use crate::sample::{Payload, SampleEnvelope, Timestamp};
use crate::track::{ImagePacket, TrackHandle};

/// Conversion between pipeline ticks and entry milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    ticks_per_ms: i64,
}

impl TimeBase {
    /// `ticks_per_ms` must be positive (checked by `PipelineConfig::validate`)
    pub fn new(ticks_per_ms: i64) -> Self {
        Self {
            ticks_per_ms: ticks_per_ms.max(1),
        }
    }

    pub fn to_ms(&self, ticks: Timestamp) -> i64 {
        ticks / self.ticks_per_ms
    }

    pub fn to_ticks(&self, ms: i64) -> Timestamp {
        ms.saturating_mul(self.ticks_per_ms)
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new(10_000)
    }
}

/// Byte payload of a sample together with its time range
#[derive(Debug, Clone, Copy)]
pub struct ByteSample<'a> {
    pub start: Timestamp,
    pub stop: Option<Timestamp>,
    pub data: &'a [u8],
}

/// Per-sample decode dispatch for one configured format
#[derive(Debug, Clone, Copy)]
pub struct FormatDecoder {
    format: SubtitleFormat,
    time_base: TimeBase,
}

impl FormatDecoder {
    pub fn new(format: SubtitleFormat, time_base: TimeBase) -> Self {
        Self { format, time_base }
    }

    pub fn format(&self) -> SubtitleFormat {
        self.format
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Decode one sample into `track`.
    ///
    /// Returns the presentation time from which rendering must be
    /// recomputed, or `None` if the track was not changed.
    pub fn decode<H: TrackHandle>(&self, envelope: &SampleEnvelope, track: &mut H) -> Option<Timestamp> {
        let data = match envelope.payload() {
            Payload::Image(image) => {
                if self.format.uses_image_handle() {
                    track.append_image_update(image.clone());
                } else {
                    tracing::debug!(format = self.format.name(), "image sample ignored");
                }
                return None;
            }
            Payload::Bytes(data) => &data[..],
        };

        if data.is_empty() {
            return None;
        }

        let sample = ByteSample {
            start: envelope.start(),
            stop: envelope.stop(),
            data,
        };
        let tb = self.time_base;

        match self.format {
            SubtitleFormat::EmbeddedText => text::decode_embedded(&sample, tb, track),
            SubtitleFormat::PlainText => text::decode_plain(&sample, tb, track),
            SubtitleFormat::Gab1Container => gab::decode_gab1(&sample, tb, track),
            SubtitleFormat::Gab2Container => gab::decode_gab2(&sample, tb, track),
            SubtitleFormat::Utf8Line => text::decode_utf8(&sample, tb, track),
            SubtitleFormat::WebVtt => text::decode_webvtt(&sample, tb, track),
            SubtitleFormat::AdvancedSubStation { field_count } => {
                ass::decode_ass(&sample, tb, field_count.get(), track)
            }
            SubtitleFormat::StructuredStreamFormat => text::decode_structured(&sample, tb, track),
            SubtitleFormat::RunLengthImage => {
                tracing::debug!("byte sample ignored for run-length image stream");
                None
            }
            SubtitleFormat::VobSubImage => {
                track.append_image_packet(ImagePacket {
                    start: sample.start,
                    stop: sample.stop,
                    data: bytes::Bytes::copy_from_slice(sample.data),
                });
                None
            }
        }
    }
}

/// Base-10 integer with C `strtol` tolerance: leading whitespace, optional
/// sign, trailing garbage ignored; anything unparseable is `0`.
pub fn parse_int(field: &str) -> i32 {
    let s = field.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return 0;
    }

    let magnitude: i64 = digits[..len].parse().unwrap_or(i64::MAX);
    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Single-byte text up to the first NUL: UTF-8 when valid, Latin-1 otherwise
pub fn decode_narrow(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..end];
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// UTF-16LE text up to the first NUL code unit
pub fn decode_wide(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::ImageHandle;
    use crate::track::MemoryTrack;

    #[test]
    fn test_time_base() {
        let tb = TimeBase::new(10_000);
        assert_eq!(tb.to_ms(15_000_000), 1500);
        assert_eq!(tb.to_ticks(1000), 10_000_000);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int("  -7"), -7);
        assert_eq!(parse_int("+3"), 3);
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int("-"), 0);
        assert_eq!(parse_int("99999999999"), i32::MAX);
    }

    #[test]
    fn test_decode_narrow() {
        assert_eq!(decode_narrow(b"en\0junk"), "en");
        assert_eq!(decode_narrow("caf\u{e9}".as_bytes()), "caf\u{e9}");
        assert_eq!(decode_narrow(&[b'c', b'a', b'f', 0xE9]), "caf\u{e9}");
    }

    #[test]
    fn test_decode_wide() {
        let bytes: Vec<u8> = "Hi\0x"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(decode_wide(&bytes), "Hi");
        assert_eq!(decode_wide(&[b'A', 0, b'B']), "A");
    }

    #[test]
    fn test_image_forwarded_for_run_length_stream() {
        let decoder = FormatDecoder::new(SubtitleFormat::RunLengthImage, TimeBase::default());
        let mut track = MemoryTrack::default();
        let image = ImageHandle::from_buffer(vec![1u8, 2, 3]);

        let envelope = SampleEnvelope::from_image(0, None, image.clone());
        assert_eq!(decoder.decode(&envelope, &mut track), None);
        assert_eq!(track.images.len(), 1);
        assert!(track.images[0].ptr_eq(&image));
    }

    #[test]
    fn test_image_ignored_for_text_stream() {
        let decoder = FormatDecoder::new(SubtitleFormat::Utf8Line, TimeBase::default());
        let mut track = MemoryTrack::default();

        let envelope = SampleEnvelope::from_image(0, None, ImageHandle::from_buffer(vec![1u8]));
        assert_eq!(decoder.decode(&envelope, &mut track), None);
        assert!(track.images.is_empty());
    }

    #[test]
    fn test_bytes_ignored_for_run_length_stream() {
        let decoder = FormatDecoder::new(SubtitleFormat::RunLengthImage, TimeBase::default());
        let mut track = MemoryTrack::default();

        let envelope = SampleEnvelope::from_slice(0, Some(10), b"abc");
        assert_eq!(decoder.decode(&envelope, &mut track), None);
        assert!(track.images.is_empty());
    }

    #[test]
    fn test_vobsub_packet_forwarded() {
        let decoder = FormatDecoder::new(SubtitleFormat::VobSubImage, TimeBase::default());
        let mut track = MemoryTrack::default();

        let envelope = SampleEnvelope::from_slice(100, Some(200), &[0x00, 0x10, 0x20]);
        assert_eq!(decoder.decode(&envelope, &mut track), None);
        assert_eq!(track.image_packets.len(), 1);
        assert_eq!(track.image_packets[0].start, 100);
        assert_eq!(track.image_packets[0].stop, Some(200));
        assert_eq!(&track.image_packets[0].data[..], &[0x00, 0x10, 0x20]);
    }

    #[test]
    fn test_empty_payload_is_no_change() {
        let decoder = FormatDecoder::new(SubtitleFormat::Utf8Line, TimeBase::default());
        let mut track = MemoryTrack::default();

        let envelope = SampleEnvelope::from_slice(0, Some(10), b"");
        assert_eq!(decoder.decode(&envelope, &mut track), None);
        assert!(track.entries.is_empty());
    }
}
