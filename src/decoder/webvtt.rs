//! WebVTT cue text to SSA-styled text

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<(/?)([^\s.>/]*)([^>]*)>").expect("valid tag regex"))
}

/// SSA colour (`&HBBGGRR&`) of a WebVTT default colour class
fn class_colour(class: &str) -> Option<&'static str> {
    let colour = match class {
        "white" => "&HFFFFFF&",
        "lime" => "&H00FF00&",
        "cyan" => "&HFFFF00&",
        "red" => "&H0000FF&",
        "yellow" => "&H00FFFF&",
        "magenta" => "&HFF00FF&",
        "blue" => "&HFF0000&",
        "black" => "&H000000&",
        _ => return None,
    };
    Some(colour)
}

fn translate_tag(caps: &Captures<'_>) -> String {
    let closing = !caps[1].is_empty();
    let name = caps[2].to_ascii_lowercase();
    let rest = &caps[3];

    match (name.as_str(), closing) {
        ("b" | "i" | "u" | "s", false) => format!("{{\\{}1}}", name),
        ("b" | "i" | "u" | "s", true) => format!("{{\\{}0}}", name),
        ("c", false) => rest
            .split('.')
            .find_map(class_colour)
            .map(|colour| format!("{{\\c{}}}", colour))
            .unwrap_or_default(),
        ("c", true) => "{\\c}".to_string(),
        // voice, lang, ruby, rt and cue timestamps
        _ => String::new(),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\\h")
        .replace("&lrm;", "\u{200E}")
        .replace("&rlm;", "\u{200F}")
        .replace("&amp;", "&")
}

/// Translate WebVTT cue text into styled text.
///
/// Timing lines are dropped, formatting tags become SSA override tags,
/// entities are decoded and line breaks become `\N`.
pub fn to_styled_text(cue: &str) -> String {
    let cue = cue.replace("\r\n", "\n");
    let lines: Vec<String> = cue
        .lines()
        .filter(|line| !line.contains("-->"))
        .map(|line| {
            let styled = tag_regex().replace_all(line, |caps: &Captures<'_>| translate_tag(caps));
            decode_entities(&styled).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();

    lines.join("\\N")
}
