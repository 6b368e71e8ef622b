//! One-entry-per-sample text formats

use super::{decode_narrow, gab, webvtt, ByteSample, TimeBase};
use crate::sample::Timestamp;
use crate::track::{SubtitleEntry, TimedText, TrackHandle};

/// Text streams whose payload may be a GAB1/GAB2 container or bare text
pub fn decode_embedded(
    sample: &ByteSample<'_>,
    tb: TimeBase,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    if sample.data.starts_with(gab::GAB1_MAGIC) {
        gab::decode_gab1(sample, tb, track)
    } else if sample.data.starts_with(gab::GAB2_MAGIC) {
        gab::decode_gab2(sample, tb, track)
    } else {
        decode_plain(sample, tb, track)
    }
}

/// Single-byte text; CRLF collapsed, surrounding whitespace trimmed
pub fn decode_plain(
    sample: &ByteSample<'_>,
    tb: TimeBase,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    if sample.data.first().map_or(true, |&b| b == 0) {
        return None;
    }

    let text = decode_narrow(sample.data).replace("\r\n", "\n");
    append_text(sample, tb, text.trim(), track)
}

/// UTF-8 text line
pub fn decode_utf8(
    sample: &ByteSample<'_>,
    tb: TimeBase,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    let text = String::from_utf8_lossy(sample.data);
    append_text(sample, tb, text.trim(), track)
}

/// UTF-8 WebVTT cue payload, translated to styled text first
pub fn decode_webvtt(
    sample: &ByteSample<'_>,
    tb: TimeBase,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    let text = String::from_utf8_lossy(sample.data);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let styled = webvtt::to_styled_text(text);
    append_text(sample, tb, styled.trim(), track)
}

/// UTF-8 fragment for the structured renderer; times stay in ticks
pub fn decode_structured(
    sample: &ByteSample<'_>,
    _tb: TimeBase,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    let text = String::from_utf8_lossy(sample.data);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let stop = required_stop(sample)?;

    track.append_timed_text(TimedText {
        start: sample.start,
        stop,
        text: text.to_string(),
    });
    Some(sample.start)
}

fn append_text(
    sample: &ByteSample<'_>,
    tb: TimeBase,
    text: &str,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    if text.is_empty() {
        return None;
    }
    let stop = required_stop(sample)?;

    track.append_entry(SubtitleEntry::new(tb.to_ms(sample.start), tb.to_ms(stop), text));
    Some(sample.start)
}

pub(crate) fn required_stop(sample: &ByteSample<'_>) -> Option<Timestamp> {
    if sample.stop.is_none() {
        tracing::debug!(start = sample.start, "text sample without stop time dropped");
    }
    sample.stop
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::MemoryTrack;

    fn sample(data: &[u8], start: i64, stop: i64) -> ByteSample<'_> {
        ByteSample {
            start,
            stop: Some(stop),
            data,
        }
    }

    #[test]
    fn test_plain_text_collapses_crlf_and_trims() {
        let tb = TimeBase::new(1);
        let mut track = MemoryTrack::default();

        let changed = decode_plain(&sample(b"\r\nHello\r\n", 500, 1500), tb, &mut track);
        assert_eq!(changed, Some(500));
        assert_eq!(track.entries, vec![SubtitleEntry::new(500, 1500, "Hello")]);
    }

    #[test]
    fn test_plain_text_keeps_inner_line_breaks() {
        let tb = TimeBase::default();
        let mut track = MemoryTrack::default();

        decode_plain(&sample(b"one\r\ntwo", 10_000, 20_000), tb, &mut track);
        assert_eq!(track.entries[0].text, "one\ntwo");
        assert_eq!(track.entries[0].start_ms, 1);
        assert_eq!(track.entries[0].stop_ms, 2);
    }

    #[test]
    fn test_plain_text_leading_nul_ignored() {
        let mut track = MemoryTrack::default();
        assert_eq!(decode_plain(&sample(b"\0abc", 0, 1), TimeBase::default(), &mut track), None);
        assert!(track.entries.is_empty());
    }

    #[test]
    fn test_whitespace_only_produces_nothing() {
        let mut track = MemoryTrack::default();
        assert_eq!(decode_plain(&sample(b" \r\n\t", 0, 1), TimeBase::default(), &mut track), None);
        assert_eq!(decode_utf8(&sample(b"   ", 0, 1), TimeBase::default(), &mut track), None);
        assert!(track.entries.is_empty());
    }

    #[test]
    fn test_missing_stop_time_dropped() {
        let mut track = MemoryTrack::default();
        let sample = ByteSample {
            start: 0,
            stop: None,
            data: b"text",
        };
        assert_eq!(decode_utf8(&sample, TimeBase::default(), &mut track), None);
        assert!(track.entries.is_empty());
    }

    #[test]
    fn test_utf8_line() {
        let tb = TimeBase::default();
        let mut track = MemoryTrack::default();

        let changed = decode_utf8(&sample(" Gr\u{fc}\u{df}e ".as_bytes(), 20_000, 40_000), tb, &mut track);
        assert_eq!(changed, Some(20_000));
        assert_eq!(track.entries[0].text, "Gr\u{fc}\u{df}e");
        assert_eq!(track.entries[0].start_ms, 2);
        assert_eq!(track.entries[0].stop_ms, 4);
    }

    #[test]
    fn test_webvtt_markup_translated() {
        let mut track = MemoryTrack::default();

        decode_webvtt(&sample(b"<i>Hello</i> &amp; bye", 0, 10), TimeBase::new(1), &mut track);
        assert_eq!(track.entries[0].text, "{\\i1}Hello{\\i0} & bye");
    }

    #[test]
    fn test_webvtt_markup_only_produces_nothing() {
        let mut track = MemoryTrack::default();
        let changed = decode_webvtt(&sample(b"<v Bob></v>", 0, 10), TimeBase::new(1), &mut track);
        assert_eq!(changed, None);
        assert!(track.entries.is_empty());
    }

    #[test]
    fn test_structured_fragment_keeps_ticks() {
        let mut track = MemoryTrack::default();

        let changed = decode_structured(&sample(b" <p>x</p> ", 123, 456), TimeBase::default(), &mut track);
        assert_eq!(changed, Some(123));
        assert_eq!(
            track.timed_text,
            vec![TimedText {
                start: 123,
                stop: 456,
                text: "<p>x</p>".to_string()
            }]
        );
        assert!(track.entries.is_empty());
    }

    #[test]
    fn test_embedded_falls_back_to_plain_text() {
        let mut track = MemoryTrack::default();
        let changed = decode_embedded(&sample(b"GAB3 is text", 0, 10), TimeBase::new(1), &mut track);
        assert_eq!(changed, Some(0));
        assert_eq!(track.entries[0].text, "GAB3 is text");
    }
}
