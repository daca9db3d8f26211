use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("failed to initialize OCR engine: {0}")]
    EngineInitFailed(String),

    #[error("image conversion error: {0}")]
    ConversionError(String),

    #[error("OCR service request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("OCR service returned {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("malformed OCR response: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OcrError>;
