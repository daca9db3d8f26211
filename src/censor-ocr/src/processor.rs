use crate::detection::TextDetection;
use crate::engine::{Engine, EngineConfig};
use crate::error::{OcrError, Result};
use image::RgbImage;
use tracing::debug;

/// Text detection capability consumed by the redaction engine.
///
/// Implementations are built once per process and shared read-only between
/// sessions, so `detect` takes `&self` and must be safe to call concurrently.
pub trait Detector: Send + Sync {
    /// Detect text regions, in the order the recognizer reports them
    fn detect(&self, image: &RgbImage) -> Result<Vec<TextDetection>>;
}

/// OCR processor that encodes images and performs recognition
pub struct Processor {
    engine: Engine,
}

impl Processor {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let engine = Engine::new(config)?;
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Process a single image
    pub fn process_image(&self, image: &RgbImage) -> Result<Vec<TextDetection>> {
        debug!("processing image {}x{}", image.width(), image.height());

        let png = Self::encode_png(image)?;
        self.engine.recognize(png)
    }

    fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::ConversionError(format!(
                "image has no pixels: {}x{}",
                image.width(),
                image.height()
            )));
        }

        let mut png_data = Vec::new();
        image.write_to(
            &mut std::io::Cursor::new(&mut png_data),
            image::ImageFormat::Png,
        )?;

        debug!("encoded image as {} bytes of PNG", png_data.len());
        Ok(png_data)
    }
}

impl Detector for Processor {
    fn detect(&self, image: &RgbImage) -> Result<Vec<TextDetection>> {
        self.process_image(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_image_rejected() {
        let empty = RgbImage::new(0, 0);
        assert!(matches!(
            Processor::encode_png(&empty),
            Err(OcrError::ConversionError(_))
        ));
    }

    #[test]
    fn test_png_encoding() {
        let image = RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]));
        let png = Processor::encode_png(&image).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded, image);
    }
}
