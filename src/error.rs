//! Error types for subprobe

use thiserror::Error;

/// Main error type for subprobe
///
/// Per-item failures (one link, one probe, one geo chunk) are isolated by the
/// stage that produced them; only `Serialization` and `Io` on the final report
/// are fatal for the whole run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("probe timed out")]
    ProbeTimeout,

    #[error("probe refused: {0}")]
    ProbeRefused(String),

    #[error("geo batch failed: {0}")]
    GeoBatch(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for subprobe
pub type Result<T> = std::result::Result<T, Error>;
