//! AdvancedSubStation sample lines
//!
//! Matroska-style ASS/SSA samples carry one event per sample with the
//! timing stripped:
//! ```text
//! ReadOrder, Layer, Style, Name, MarginL, MarginR, MarginV, [MarginB,] Effect, Text
//! ```
//! The text field is the remainder of the line and may contain commas.

use super::text::required_stop;
use super::{parse_int, ByteSample, TimeBase};
use crate::sample::Timestamp;
use crate::track::{Margins, SubtitleEntry, TrackHandle};

/// Parse one event line into an entry spanning `start_ms..stop_ms`.
///
/// Returns `None` if the line does not split into exactly `field_count`
/// fields or the text field is empty.
pub fn parse_line(line: &str, field_count: usize, start_ms: i64, stop_ms: i64) -> Option<SubtitleEntry> {
    let fields: Vec<&str> = line.splitn(field_count, ',').collect();
    if fields.len() != field_count {
        tracing::debug!(expected = field_count, found = fields.len(), "ass: field count mismatch, line dropped");
        return None;
    }

    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or_default();

    let read_order = parse_int(next());
    let layer = parse_int(next());
    let style = next().to_string();
    let actor = next().to_string();
    let left = parse_int(next());
    let right = parse_int(next());
    let vertical = parse_int(next());
    let bottom = if field_count == 10 {
        parse_int(next())
    } else {
        vertical
    };
    let effect = next().to_string();
    let text = next();

    if text.is_empty() {
        return None;
    }

    Some(SubtitleEntry {
        start_ms,
        stop_ms,
        text: text.to_string(),
        style: Some(style),
        actor: Some(actor),
        effect: Some(effect),
        margins: Some(Margins {
            left,
            right,
            top: vertical,
            bottom,
        }),
        layer: Some(layer),
        read_order: Some(read_order),
    })
}

pub fn decode_ass(
    sample: &ByteSample<'_>,
    tb: TimeBase,
    field_count: usize,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    let line = String::from_utf8_lossy(sample.data);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let stop = required_stop(sample)?;

    let entry = parse_line(line, field_count, tb.to_ms(sample.start), tb.to_ms(stop))?;
    track.append_entry(entry);
    Some(sample.start)
}
