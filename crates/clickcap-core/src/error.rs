//! Error types for the clickcap-core library.
//!
//! These cover model loading, configuration and driver helpers. Solving a
//! captcha never surfaces them: `CaptchaSolver::solve` folds every failure
//! into a classified `SolveResult`.

use thiserror::Error;

/// Main error type for the clickcap library.
#[derive(Error, Debug)]
pub enum ClickcapError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed `data:` URI handed over by the driver.
    #[error("invalid data URI: {0}")]
    DataUri(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ClickcapError {
    fn from(err: serde_json::Error) -> Self {
        ClickcapError::Config(err.to_string())
    }
}

/// Errors related to glyph detection and recognition.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Glyph detection failed.
    #[error("glyph detection failed: {0}")]
    Detection(String),

    /// Character recognition failed.
    #[error("character recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the clickcap library.
pub type Result<T> = std::result::Result<T, ClickcapError>;
