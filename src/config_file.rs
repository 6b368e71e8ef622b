//! Configuration file support
//!
//! Loads pipeline configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{PipelineConfig, SubtitleFormat};
use crate::error::Result;

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Pipeline settings
    pub pipeline: PipelineSettings,
    /// Track naming settings
    pub track: Option<TrackSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Stream format
    pub format: SubtitleFormat,
    /// Ticks per millisecond
    pub ticks_per_ms: Option<i64>,
    /// Decode worker thread name
    pub thread_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSettings {
    /// ISO 639-2 language code
    pub language: Option<String>,
    /// Track title
    pub title: Option<String>,
    /// Upstream source name
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            pipeline: PipelineSettings {
                format: SubtitleFormat::Utf8Line,
                ticks_per_ms: Some(10_000),
                thread_name: None,
            },
            track: Some(TrackSettings {
                language: Some("eng".to_string()),
                title: None,
                source_name: None,
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Tracing filter directive for the configured log level
    pub fn log_filter(&self) -> String {
        let level = self
            .logging
            .as_ref()
            .map(|l| l.level.as_str())
            .unwrap_or("info");
        format!("subtitle_ingest={}", level)
    }

    /// True if logs should be emitted as JSON
    pub fn json_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    /// Convert to PipelineConfig
    pub fn into_pipeline_config(self) -> Result<PipelineConfig> {
        let defaults = PipelineConfig::default();
        let track = self.track.unwrap_or(TrackSettings {
            language: None,
            title: None,
            source_name: None,
        });

        let config = PipelineConfig {
            format: self.pipeline.format,
            ticks_per_ms: self.pipeline.ticks_per_ms.unwrap_or(defaults.ticks_per_ms),
            language: track.language,
            track_title: track.title,
            source_name: track.source_name.unwrap_or(defaults.source_name),
            thread_name: self.pipeline.thread_name.unwrap_or(defaults.thread_name),
        };
        config.validate()?;
        Ok(config)
    }
}
