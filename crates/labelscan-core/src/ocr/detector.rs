//! Text detector seam.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// One detection as reported by a scene-text engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Quadrilateral (x1, y1, x2, y2, x3, y3, x4, y4), clockwise from top-left.
    pub bbox: [f32; 8],
    /// Recognized text.
    pub text: String,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
}

/// Detects and recognizes text in an image.
///
/// Implementations are not required to be thread-safe for concurrent calls;
/// the processor serializes access.
pub trait TextDetector: Send {
    /// Detect text regions in a preprocessed image.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<RawDetection>, OcrError>;
}

impl<D: TextDetector + ?Sized> TextDetector for Box<D> {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<RawDetection>, OcrError> {
        (**self).detect(image)
    }
}
