//! Subtitle ingest replay tool
//!
//! Feeds a scripted sequence of subtitle samples through the ingest
//! pipeline and prints the resulting track and pipeline counters as JSON.
//!
//! ```text
//! subtitle-ingest <config.toml> <samples.json>
//! ```

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subtitle_ingest::{
    ConfigFile, IngestError, MemoryTrackStore, NullSink, Result, SampleTimes, SubtitlePipeline, Timestamp,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "subtitle-ingest";

/// One step of a replay script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ScriptItem {
    Segment { segment: SegmentSpec },
    EndOfStream { eos: bool },
    Sample(SampleSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct SegmentSpec {
    start: Timestamp,
    stop: Timestamp,
    #[serde(default = "default_rate")]
    rate: f64,
}

fn default_rate() -> f64 {
    1.0
}

/// Sample times are in pipeline ticks; the payload is given either as text
/// or as hex-encoded bytes
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct SampleSpec {
    start: Option<Timestamp>,
    stop: Option<Timestamp>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    hex: Option<String>,
}

impl SampleSpec {
    fn times(&self) -> SampleTimes {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => SampleTimes::Both(start, stop),
            (Some(start), None) => SampleTimes::StartOnly(start),
            _ => SampleTimes::Unset,
        }
    }

    fn payload(&self) -> Result<Vec<u8>> {
        match (&self.text, &self.hex) {
            (Some(text), None) => Ok(text.as_bytes().to_vec()),
            (None, Some(hex)) => decode_hex(hex),
            _ => Err(IngestError::Config(
                "sample needs exactly one of `text` or `hex`".to_string(),
            )),
        }
    }
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(IngestError::Config(format!("odd number of hex digits in {:?}", hex)));
    }

    digits
        .chunks_exact(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| IngestError::Config(format!("invalid hex digits in {:?}", hex)))
        })
        .collect()
}

fn load_script(path: &Path) -> Result<Vec<ScriptItem>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "ingest.toml".to_string());
    let script_path = args
        .next()
        .ok_or_else(|| IngestError::Config(format!("usage: {} <config.toml> <samples.json>", APP_NAME)))?;

    let config_file = if Path::new(&config_path).exists() {
        ConfigFile::from_file(&config_path)?
    } else {
        ConfigFile::default_config()
    };

    init_logging(&config_file);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);

    let config = config_file.into_pipeline_config()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let script = load_script(Path::new(&script_path))?;
    tracing::info!(items = script.len(), script = %script_path, "replaying samples");

    let store = Arc::new(MemoryTrackStore::new());
    let pipeline = SubtitlePipeline::new(config, Arc::clone(&store), Arc::new(NullSink))?;
    let delivery = pipeline.delivery();

    for item in &script {
        match item {
            ScriptItem::Segment { segment } => {
                pipeline.new_segment(segment.start, segment.stop, segment.rate);
            }
            ScriptItem::EndOfStream { eos } => {
                if *eos {
                    delivery.end_of_stream();
                }
            }
            ScriptItem::Sample(sample) => {
                delivery.receive(sample.times(), &sample.payload()?);
            }
        }
    }

    let stats = pipeline.shutdown();
    let report = serde_json::json!({
        "track": store.snapshot().summary(),
        "stats": stats,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Initialize logging with tracing; output goes to stderr so stdout stays JSON
fn init_logging(config: &ConfigFile) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter().into());

    if config.json_logging() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
