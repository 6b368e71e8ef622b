//! GAB1 / GAB2 tagged subtitle containers
//!
//! Layout (little-endian):
//! ```text
//! "GAB1" 0x00 { tag:u16 size:u16 data[size] }*
//! "GAB2" 0x00 { tag:u16 size:u32 data[size] }*
//! ```
//! Unknown tags are skipped by their declared size.

use super::{decode_narrow, decode_wide, ssa, subrip, ByteSample, TimeBase};
use crate::sample::Timestamp;
use crate::track::{SubtitleEntry, TrackHandle};

pub const GAB1_MAGIC: &[u8] = b"GAB1";
pub const GAB2_MAGIC: &[u8] = b"GAB2";

/// Magic plus its terminating NUL
const CONTAINER_HEADER_LEN: usize = 5;

/// Record tags
pub mod tag {
    /// Narrow, NUL-terminated track name
    pub const LANGUAGE: u16 = 0;
    /// start_ms:i32, stop_ms:i32, narrow NUL-terminated text
    pub const ENTRY: u16 = 1;
    /// UTF-16LE, NUL-terminated track name
    pub const LANGUAGE_UNICODE: u16 = 2;
    /// start_ms:i32, stop_ms:i32, UTF-16LE NUL-terminated text
    pub const ENTRY_UNICODE: u16 = 3;
    /// Complete subtitle file replacing the track (GAB2 only)
    pub const RAW_TEXT_SUBTITLE: u16 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeField {
    U16,
    U32,
}

impl SizeField {
    fn header_len(self) -> usize {
        match self {
            SizeField::U16 => 4,
            SizeField::U32 => 6,
        }
    }

    fn read(self, header: &[u8]) -> usize {
        match self {
            SizeField::U16 => u16::from_le_bytes([header[2], header[3]]) as usize,
            SizeField::U32 => {
                u32::from_le_bytes([header[2], header[3], header[4], header[5]]) as usize
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Record<'a> {
    tag: u16,
    body: &'a [u8],
}

/// Iterator over the tagged records of a container body
struct Records<'a> {
    data: &'a [u8],
    pos: usize,
    size_field: SizeField,
}

impl<'a> Records<'a> {
    fn new(data: &'a [u8], size_field: SizeField) -> Self {
        Self {
            data,
            pos: 0,
            size_field,
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        let rest = &self.data[self.pos..];
        let header_len = self.size_field.header_len();
        if rest.len() < header_len {
            if !rest.is_empty() {
                tracing::debug!(trailing = rest.len(), "container: trailing bytes ignored");
            }
            self.pos = self.data.len();
            return None;
        }

        let tag = u16::from_le_bytes([rest[0], rest[1]]);
        let size = self.size_field.read(rest);
        let body = header_len
            .checked_add(size)
            .and_then(|end| rest.get(header_len..end));

        match body {
            Some(body) => {
                self.pos += header_len + size;
                Some(Record { tag, body })
            }
            None => {
                tracing::debug!(tag, size, available = rest.len() - header_len, "container: record overruns payload");
                self.pos = self.data.len();
                None
            }
        }
    }
}

fn container_body<'a>(data: &'a [u8], magic: &[u8]) -> Option<&'a [u8]> {
    if !data.starts_with(magic) {
        return None;
    }
    Some(data.get(CONTAINER_HEADER_LEN..).unwrap_or(&[]))
}

/// Timed entry record: start and stop in milliseconds, then text
fn parse_entry(body: &[u8], decode_text: fn(&[u8]) -> String) -> Option<SubtitleEntry> {
    if body.len() < 8 {
        return None;
    }
    let start = i32::from_le_bytes([body[0], body[1], body[2], body[3]]);
    let stop = i32::from_le_bytes([body[4], body[5], body[6], body[7]]);
    let text = decode_text(&body[8..]);
    if text.trim().is_empty() {
        return None;
    }
    Some(SubtitleEntry::new(start as i64, stop as i64, text))
}

/// GAB1: track name and self-timed entries.
///
/// Invalidates from the sample start when any entry was appended.
pub fn decode_gab1(
    sample: &ByteSample<'_>,
    _tb: TimeBase,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    let Some(body) = container_body(sample.data, GAB1_MAGIC) else {
        tracing::debug!(len = sample.data.len(), "gab1: missing magic, sample dropped");
        return None;
    };

    let mut appended = false;
    for record in Records::new(body, SizeField::U16) {
        match record.tag {
            tag::LANGUAGE => track.set_name(decode_narrow(record.body)),
            tag::LANGUAGE_UNICODE => track.set_name(decode_wide(record.body)),
            tag::ENTRY | tag::ENTRY_UNICODE => {
                let decode_text = if record.tag == tag::ENTRY {
                    decode_narrow
                } else {
                    decode_wide
                };
                match parse_entry(record.body, decode_text) {
                    Some(entry) => {
                        track.append_entry(entry);
                        appended = true;
                    }
                    None => {
                        tracing::debug!(tag = record.tag, size = record.body.len(), "gab1: empty or short entry skipped")
                    }
                }
            }
            other => {
                tracing::debug!(tag = other, size = record.body.len(), "gab1: skipping unknown tag")
            }
        }
    }
    appended.then_some(sample.start)
}

/// GAB2: track name and whole-track replacement from an embedded SubRip or
/// SSA/ASS file.
///
/// Invalidates from the sample start when the track was replaced. A file
/// that yields no entries leaves the track as it was.
pub fn decode_gab2(
    sample: &ByteSample<'_>,
    _tb: TimeBase,
    track: &mut dyn TrackHandle,
) -> Option<Timestamp> {
    let Some(body) = container_body(sample.data, GAB2_MAGIC) else {
        tracing::debug!(len = sample.data.len(), "gab2: missing magic, sample dropped");
        return None;
    };

    let mut replaced = false;
    for record in Records::new(body, SizeField::U32) {
        match record.tag {
            tag::LANGUAGE_UNICODE => track.set_name(decode_wide(record.body)),
            tag::RAW_TEXT_SUBTITLE => {
                let text = subrip::decode_blob(record.body);
                let entries = if ssa::is_script(&text) {
                    ssa::parse(&text)
                } else {
                    subrip::parse(&text)
                };
                if entries.is_empty() {
                    tracing::debug!(size = record.body.len(), "gab2: subtitle file without entries ignored");
                    continue;
                }
                tracing::debug!(entries = entries.len(), "gab2: track replaced");
                track.replace_all(entries);
                replaced = true;
            }
            other => {
                tracing::debug!(tag = other, size = record.body.len(), "gab2: skipping unknown tag")
            }
        }
    }
    replaced.then_some(sample.start)
}
