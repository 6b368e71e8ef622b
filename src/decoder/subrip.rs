//! SubRip text used by GAB2 whole-track replacement

use regex::Regex;
use std::sync::OnceLock;

use super::{decode_narrow, decode_wide};
use crate::track::SubtitleEntry;

fn timing_regex() -> &'static Regex {
    static TIMING: OnceLock<Regex> = OnceLock::new();
    TIMING.get_or_init(|| {
        Regex::new(
            r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})",
        )
        .expect("valid timing regex")
    })
}

/// Decode an embedded subtitle file: UTF-8 (with or without BOM) or
/// UTF-16LE with BOM
pub fn decode_blob(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).trim_end_matches('\0').to_string();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_wide(rest);
    }
    decode_narrow(bytes)
}

/// Milliseconds of one timing; `None` if the hour field overflows
pub(super) fn to_ms(caps: &regex::Captures<'_>, first: usize) -> Option<i64> {
    let field = |i: usize| -> Option<i64> { caps[first + i].parse().ok() };
    let frac = &caps[first + 3];
    // "5" and "50" are tenths and hundredths
    let millis = field(3)? * 10i64.pow(3 - frac.len() as u32);

    field(0)?
        .checked_mul(60)?
        .checked_add(field(1)?)?
        .checked_mul(60)?
        .checked_add(field(2)?)?
        .checked_mul(1000)?
        .checked_add(millis)
}

/// Parse SubRip cues: optional index line, timing line, text lines, blank
/// line. Blocks without a timing line or without text are skipped.
pub fn parse(text: &str) -> Vec<SubtitleEntry> {
    let text = text.replace("\r\n", "\n");
    let mut entries = Vec::new();
    let mut current: Option<(i64, i64, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(caps) = timing_regex().captures(line) {
            flush(&mut current, &mut entries);
            match (to_ms(&caps, 1), to_ms(&caps, 5)) {
                (Some(start), Some(stop)) => current = Some((start, stop, Vec::new())),
                _ => tracing::debug!(line, "subrip: timing out of range, cue skipped"),
            }
            continue;
        }

        if line.trim().is_empty() {
            flush(&mut current, &mut entries);
        } else if let Some((_, _, lines)) = current.as_mut() {
            lines.push(line.trim_end());
        }
    }
    flush(&mut current, &mut entries);
    entries
}

fn flush(current: &mut Option<(i64, i64, Vec<&str>)>, entries: &mut Vec<SubtitleEntry>) {
    if let Some((start, stop, lines)) = current.take() {
        if lines.is_empty() {
            tracing::debug!(start, "subrip: cue without text skipped");
            return;
        }
        entries.push(SubtitleEntry::new(start, stop, lines.join("\n")));
    }
}
