//! Error types for the image evaluation harness.

use thiserror::Error;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Main error type for the image evaluation harness.
#[derive(Error, Debug)]
pub enum EvalError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error decoding or encoding an image file.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Two buffers passed to a pairwise metric differ in shape.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A metric parameter is out of range (e.g. zero patch size).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The deep-feature extractor failed to load or run.
    #[error("Feature extraction error: {0}")]
    FeatureExtraction(String),

    /// Report could not be serialized.
    #[error("Report error: {0}")]
    Report(String),
}

impl From<toml::de::Error> for EvalError {
    fn from(err: toml::de::Error) -> Self {
        EvalError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::Report(err.to_string())
    }
}
