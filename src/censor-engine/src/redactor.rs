//! Image redaction

use crate::error::{Result, SessionError};
use crate::matching::matches;
use censor_ocr::{Quad, TextDetection};
use image::{ImageReader, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;
use tracing::debug;

/// Default opaque fill painted over matched regions
pub const FILL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Outcome of a redaction pass
#[derive(Debug, Clone, PartialEq)]
pub enum RedactionResult {
    /// At least one region matched; holds the painted copy
    Redacted(RgbImage),
    /// Nothing matched; every detected string in detection order
    NoMatch(Vec<String>),
}

/// Paints matched text regions with a solid color
#[derive(Debug, Clone, Copy)]
pub struct Redactor {
    fill: Rgb<u8>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(FILL_COLOR)
    }
}

impl Redactor {
    pub fn new(fill: Rgb<u8>) -> Self {
        Self { fill }
    }

    pub fn fill(&self) -> Rgb<u8> {
        self.fill
    }

    /// Redact every detection matching `phrase` on a copy of `image`.
    ///
    /// Regions are the axis-aligned box spanned by quad corners 0 and 2, so
    /// rotated text is covered approximately rather than pixel-exact.
    pub fn redact(
        &self,
        image: &RgbImage,
        detections: &[TextDetection],
        phrase: &str,
    ) -> RedactionResult {
        let mut canvas: Option<RgbImage> = None;

        for detection in detections.iter().filter(|d| matches(d, phrase)) {
            debug!("redacting '{}' at {:?}", detection.text, detection.quad);
            let canvas = canvas.get_or_insert_with(|| image.clone());
            if let Some(rect) = bounding_rect(&detection.quad, canvas.width(), canvas.height()) {
                draw_filled_rect_mut(canvas, rect, self.fill);
            }
        }

        match canvas {
            Some(redacted) => RedactionResult::Redacted(redacted),
            None => RedactionResult::NoMatch(
                detections.iter().map(|d| d.text.clone()).collect(),
            ),
        }
    }
}

/// Box spanned by the quad's diagonal corners, clamped to the image.
///
/// Returns `None` when nothing of the box lies inside the image.
fn bounding_rect(quad: &Quad, width: u32, height: u32) -> Option<Rect> {
    let (a, b) = (quad.top_left(), quad.bottom_right());
    let max_x = i32::try_from(width).unwrap_or(i32::MAX);
    let max_y = i32::try_from(height).unwrap_or(i32::MAX);

    let x0 = a.x.min(b.x).clamp(0, max_x);
    let x1 = a.x.max(b.x).clamp(0, max_x);
    let y0 = a.y.min(b.y).clamp(0, max_y);
    let y1 = a.y.max(b.y).clamp(0, max_y);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32))
}

/// Decode an uploaded image file into an RGB buffer
pub fn decode_image(path: &Path) -> Result<RgbImage> {
    let invalid = |e: &dyn std::fmt::Display| {
        SessionError::InvalidImage(format!("{}: {}", path.display(), e))
    };

    let image = ImageReader::open(path)
        .map_err(|e| invalid(&e))?
        .with_guessed_format()
        .map_err(|e| invalid(&e))?
        .decode()
        .map_err(|e| invalid(&e))?
        .to_rgb8();

    if image.width() == 0 || image.height() == 0 {
        return Err(invalid(&"image has no pixels"));
    }

    debug!("decoded {:?} as {}x{}", path, image.width(), image.height());
    Ok(image)
}
