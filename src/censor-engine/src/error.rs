//! Error types for the redaction engine

use censor_ocr::OcrError;
use thiserror::Error;

/// Errors surfaced by the session dialogue
#[derive(Error, Debug)]
pub enum SessionError {
    /// Blank phrase; the session stays open so the user can retry
    #[error("phrase is empty")]
    EmptyPhrase,

    /// Uploaded file could not be decoded
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// OCR service failed
    #[error("text detection failed: {0}")]
    DetectionFailure(#[from] OcrError),

    #[error("failed to write redacted image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Background processing task panicked or was aborted
    #[error("processing task failed: {0}")]
    Worker(String),
}

impl SessionError {
    /// Whether the error ended the session
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::EmptyPhrase)
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
