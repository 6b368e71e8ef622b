use thiserror::Error;

/// Main error type for the subtitle ingest pipeline
#[derive(Error, Debug)]
pub enum IngestError {
    /// A sample envelope was built without any payload
    #[error("Sample envelope has neither a byte payload nor an image handle")]
    EmptyEnvelope,

    /// A sample envelope was built with both payload variants
    #[error("Sample envelope has both a byte payload and an image handle")]
    AmbiguousEnvelope,

    /// AdvancedSubStation lines carry either 9 or 10 fields
    #[error("Invalid AdvancedSubStation field count: {0} (expected 9 or 10)")]
    InvalidFieldCount(u8),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A JSON document could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, IngestError>;
