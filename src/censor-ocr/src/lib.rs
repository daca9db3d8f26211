//! OCR integration for Censor
//!
//! This crate talks to an external EasyOCR-compatible recognition service. It
//! encodes RGB images, posts them for recognition and parses the reported text
//! regions into quadrilaterals with confidence scores.

mod detection;
mod engine;
mod error;
mod processor;

pub use detection::{Point, Quad, TextDetection};
pub use engine::{Engine, EngineConfig};
pub use error::{OcrError, Result};
pub use processor::{Detector, Processor};

/// Initialize OCR processor with custom settings
pub fn create_processor_with_config(config: &EngineConfig) -> Result<Processor> {
    Processor::new(config)
}
