//! SubStation Alpha / Advanced SubStation script files
//!
//! Only the `[Events]` section is read. Its `Format:` line names the
//! columns of every following `Dialogue:` line; without one the ASS v4+
//! column order is assumed. Times are `H:MM:SS.cc`.

use regex::Regex;
use std::sync::OnceLock;

use super::{parse_int, subrip};
use crate::track::{Margins, SubtitleEntry};

const DEFAULT_FORMAT: &[&str] = &[
    "layer", "start", "end", "style", "name", "marginl", "marginr", "marginv", "effect", "text",
];

fn time_regex() -> &'static Regex {
    static TIME: OnceLock<Regex> = OnceLock::new();
    TIME.get_or_init(|| Regex::new(r"^\s*(\d+):(\d{1,2}):(\d{1,2})[.:](\d{1,3})\s*$").expect("valid time regex"))
}

fn parse_time(field: &str) -> Option<i64> {
    let caps = time_regex().captures(field)?;
    subrip::to_ms(&caps, 1)
}

/// True if `text` has an `[Events]` section, i.e. is a script rather than SubRip
pub fn is_script(text: &str) -> bool {
    text.lines().any(|line| line.trim().eq_ignore_ascii_case("[events]"))
}

/// Column names of a `Format:` line, lowercased
fn parse_format(spec: &str) -> Vec<String> {
    spec.split(',').map(|c| c.trim().to_ascii_lowercase()).collect()
}

fn parse_dialogue(line: &str, columns: &[String]) -> Option<SubtitleEntry> {
    let fields: Vec<&str> = line.splitn(columns.len(), ',').collect();
    if fields.len() != columns.len() {
        tracing::debug!(expected = columns.len(), found = fields.len(), "ssa: field count mismatch, line dropped");
        return None;
    }
    let field = |name: &str| -> Option<&str> {
        columns.iter().position(|c| c == name).map(|i| fields[i])
    };

    let start_ms = field("start").and_then(parse_time);
    let stop_ms = field("end").and_then(parse_time);
    let (Some(start_ms), Some(stop_ms)) = (start_ms, stop_ms) else {
        tracing::debug!(line, "ssa: bad event times, line dropped");
        return None;
    };

    let text = field("text")?;
    if text.trim().is_empty() {
        return None;
    }

    let margin = |name: &str| field(name).map(parse_int);
    let vertical = margin("marginv").unwrap_or(0);

    Some(SubtitleEntry {
        start_ms,
        stop_ms,
        text: text.trim_end().to_string(),
        style: field("style").map(|s| s.trim().to_string()),
        actor: field("name").or_else(|| field("actor")).map(|s| s.trim().to_string()),
        effect: field("effect").map(|s| s.trim().to_string()),
        margins: Some(Margins {
            left: margin("marginl").unwrap_or(0),
            right: margin("marginr").unwrap_or(0),
            top: margin("margint").unwrap_or(vertical),
            bottom: margin("marginb").unwrap_or(vertical),
        }),
        layer: field("layer").map(parse_int),
        read_order: None,
    })
}

/// Parse the `Dialogue:` events of a script, in file order.
pub fn parse(text: &str) -> Vec<SubtitleEntry> {
    let default_format: Vec<String> = DEFAULT_FORMAT.iter().map(|c| c.to_string()).collect();
    let mut columns = default_format;
    let mut in_events = false;
    let mut entries = Vec::new();

    for line in text.lines() {
        let line = line.trim_start();
        if line.starts_with('[') {
            in_events = line.trim_end().eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(spec) = line.strip_prefix("Format:") {
            let format = parse_format(spec);
            if format.last().map(String::as_str) == Some("text") {
                columns = format;
            } else {
                tracing::debug!(format = spec, "ssa: format without trailing text column ignored");
            }
        } else if let Some(event) = line.strip_prefix("Dialogue:") {
            entries.extend(parse_dialogue(event.trim_start(), &columns));
        }
    }
    entries
}
