use serde::{Deserialize, Serialize};

/// Integer pixel coordinate reported by the OCR service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Four corners of a text region, clockwise starting at the top-left corner.
///
/// Coordinates may fall outside the image; consumers clamp when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn from_coords(coords: [(i32, i32); 4]) -> Self {
        Self(coords.map(|(x, y)| Point::new(x, y)))
    }

    /// Axis-aligned box helper for tests and fixtures
    pub fn from_rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::from_coords([
            (x, y),
            (x + width, y),
            (x + width, y + height),
            (x, y + height),
        ])
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    /// Corner diagonally opposite the top-left one in clockwise order
    pub fn bottom_right(&self) -> Point {
        self.0[2]
    }
}

/// One OCR-reported text region plus its recognized string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    pub quad: Quad,
    pub text: String,
    /// Recognition confidence in `0.0..=1.0`, informational only
    pub confidence: f32,
}

impl TextDetection {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }
}
