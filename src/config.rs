//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{IngestError, Result};

/// Number of comma-separated fields in an AdvancedSubStation sample line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AssFieldCount(u8);

impl AssFieldCount {
    /// SSA / ASS
    pub const NINE: AssFieldCount = AssFieldCount(9);
    /// ASS with a separate bottom margin
    pub const TEN: AssFieldCount = AssFieldCount(10);

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for AssFieldCount {
    type Error = IngestError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            9 | 10 => Ok(AssFieldCount(value)),
            other => Err(IngestError::InvalidFieldCount(other)),
        }
    }
}

impl From<AssFieldCount> for u8 {
    fn from(count: AssFieldCount) -> u8 {
        count.0
    }
}

/// Subtitle format carried by the stream, resolved at connection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubtitleFormat {
    /// Text stream whose samples are sniffed: GAB1, GAB2 or plain text
    EmbeddedText,
    PlainText,
    Gab1Container,
    Gab2Container,
    Utf8Line,
    WebVtt,
    AdvancedSubStation { field_count: AssFieldCount },
    StructuredStreamFormat,
    /// HDMV / DVB bitmap subtitles delivered as opaque buffers
    RunLengthImage,
    /// DVD bitmap subtitles delivered as bytes
    VobSubImage,
}

impl SubtitleFormat {
    /// Human-readable format name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SubtitleFormat::EmbeddedText => "Embedded Text",
            SubtitleFormat::PlainText => "Plain Text",
            SubtitleFormat::Gab1Container => "GAB1",
            SubtitleFormat::Gab2Container => "GAB2",
            SubtitleFormat::Utf8Line => "UTF-8",
            SubtitleFormat::WebVtt => "WebVTT",
            SubtitleFormat::AdvancedSubStation { .. } => "ASS/SSA",
            SubtitleFormat::StructuredStreamFormat => "SSF",
            SubtitleFormat::RunLengthImage => "HDMV/DVB (Bitmap)",
            SubtitleFormat::VobSubImage => "VobSub (Bitmap)",
        }
    }

    /// Formats whose samples arrive as opaque image buffers
    pub fn uses_image_handle(&self) -> bool {
        matches!(self, SubtitleFormat::RunLengthImage)
    }

    /// Formats of the plain "text" stream family (sample payloads may carry
    /// their own container)
    pub fn is_embedded_text(&self) -> bool {
        matches!(
            self,
            SubtitleFormat::EmbeddedText
                | SubtitleFormat::PlainText
                | SubtitleFormat::Gab1Container
                | SubtitleFormat::Gab2Container
        )
    }
}

/// Pipeline configuration, fixed for the lifetime of one pipeline instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stream format
    pub format: SubtitleFormat,

    /// Pipeline time base: ticks per millisecond (10 000 = 100 ns ticks)
    pub ticks_per_ms: i64,

    /// ISO 639-2 language code of the stream
    pub language: Option<String>,

    /// Track title reported by the source
    pub track_title: Option<String>,

    /// Name of the upstream source, used to name embedded text tracks
    pub source_name: String,

    /// Name of the decode worker thread
    pub thread_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            format: SubtitleFormat::Utf8Line,
            ticks_per_ms: 10_000,
            language: None,
            track_title: None,
            source_name: "Input".to_string(),
            thread_name: "subtitle-decode".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn with_format(format: SubtitleFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.ticks_per_ms <= 0 {
            return Err(IngestError::Config(format!(
                "ticks_per_ms must be positive, got {}",
                self.ticks_per_ms
            )));
        }
        if self.thread_name.trim().is_empty() {
            return Err(IngestError::Config("thread_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Initial track name shown to the user
    pub fn track_name(&self) -> String {
        if self.format.is_embedded_text() {
            return format!("{} (embedded)", self.source_name);
        }

        let mut name = match self.language.as_deref() {
            Some(code) if !code.trim().is_empty() => language_name(code.trim())
                .map(str::to_string)
                .unwrap_or_else(|| code.trim().to_string()),
            _ => "Unknown".to_string(),
        };
        if let Some(title) = self.track_title.as_deref().filter(|t| !t.is_empty()) {
            name.push_str(" (");
            name.push_str(title);
            name.push(')');
        }
        name
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

/// English name of a common ISO 639-2 language code
pub fn language_name(code: &str) -> Option<&'static str> {
    let name = match code.to_ascii_lowercase().as_str() {
        "ara" => "Arabic",
        "chi" | "zho" => "Chinese",
        "cze" | "ces" => "Czech",
        "dan" => "Danish",
        "dut" | "nld" => "Dutch",
        "eng" => "English",
        "fin" => "Finnish",
        "fre" | "fra" => "French",
        "ger" | "deu" => "German",
        "gre" | "ell" => "Greek",
        "heb" => "Hebrew",
        "hun" => "Hungarian",
        "ita" => "Italian",
        "jpn" => "Japanese",
        "kor" => "Korean",
        "nor" => "Norwegian",
        "pol" => "Polish",
        "por" => "Portuguese",
        "rus" => "Russian",
        "spa" => "Spanish",
        "swe" => "Swedish",
        "tur" => "Turkish",
        _ => return None,
    };
    Some(name)
}
