//! Error types for Stabilo.

use thiserror::Error;

/// Main error type for Stabilo operations.
///
/// Only [`StabiloError::SourceUnavailable`] and sink failures are expected to
/// reach the caller of a pipeline run. Per-frame problems (estimation
/// failures, tracking loss, a stream that ends early) are absorbed by the
/// passes themselves.
#[derive(Error, Debug)]
pub enum StabiloError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Stabilo operations.
pub type Result<T> = std::result::Result<T, StabiloError>;
