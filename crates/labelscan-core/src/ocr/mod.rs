//! Image-side pipeline: preprocessing, text detection and block building.

mod blocks;
mod detector;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use blocks::SemanticBlockBuilder;
pub use detector::{RawDetection, TextDetector};
pub use preprocessing::{BackgroundKind, ImagePreprocessor};
#[cfg(feature = "native")]
pub use pure_engine::PureOnnxDetector;

use serde::Serialize;
use std::cmp::Ordering;

/// A detected text fragment with its quadrilateral and derived geometry.
///
/// Derived values are computed once in [`TextBox::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBox {
    text: String,
    /// Quadrilateral (x1, y1, x2, y2, x3, y3, x4, y4), clockwise from top-left.
    bbox: [f32; 8],
    confidence: f32,
    center_x: f32,
    center_y: f32,
    width: f32,
    height: f32,
}

impl TextBox {
    /// Create a text box; the text is trimmed.
    pub fn new(text: impl AsRef<str>, bbox: [f32; 8], confidence: f32) -> Self {
        let xs = [bbox[0], bbox[2], bbox[4], bbox[6]];
        let ys = [bbox[1], bbox[3], bbox[5], bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        Self {
            text: text.as_ref().trim().to_string(),
            bbox,
            confidence,
            center_x: xs.iter().sum::<f32>() / 4.0,
            center_y: ys.iter().sum::<f32>() / 4.0,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    /// Axis-aligned box from its corner and size.
    pub fn from_rect(text: impl AsRef<str>, x: f32, y: f32, w: f32, h: f32, confidence: f32) -> Self {
        Self::new(text, [x, y, x + w, y, x + w, y + h, x, y + h], confidence)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bbox(&self) -> &[f32; 8] {
        &self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Centroid of the four corners.
    pub fn center(&self) -> (f32, f32) {
        (self.center_x, self.center_y)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// First polygon point (the top-left corner).
    pub fn top_left(&self) -> (f32, f32) {
        (self.bbox[0], self.bbox[1])
    }
}

/// Text boxes that survived filtering, with the height of their source image.
#[derive(Debug, Clone)]
pub struct DetectedBoxes {
    pub boxes: Vec<TextBox>,
    pub image_height: u32,
}

/// Turn raw detections into text boxes.
///
/// Detections below `min_confidence` or with blank text are dropped.
pub fn build_text_boxes(
    detections: Vec<RawDetection>,
    image_height: u32,
    min_confidence: f32,
) -> DetectedBoxes {
    let boxes = detections
        .into_iter()
        .filter(|d| d.confidence >= min_confidence && !d.text.trim().is_empty())
        .map(|d| TextBox::new(&d.text, d.bbox, d.confidence))
        .collect();

    DetectedBoxes { boxes, image_height }
}

/// A spatial cluster of text boxes read as one unit, e.g. a nutrient name and its value.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticBlock {
    text_boxes: Vec<TextBox>,
    combined_text: String,
    top_left_x: f32,
    top_left_y: f32,
}

impl SemanticBlock {
    /// Build a block, ordering boxes by `row_height` buckets and then by x.
    pub fn new(mut text_boxes: Vec<TextBox>, row_height: f32) -> Self {
        let row_height = if row_height > 0.0 { row_height } else { 1.0 };

        text_boxes.sort_by(|a, b| {
            let row_a = (a.center_y / row_height).floor() as i64;
            let row_b = (b.center_y / row_height).floor() as i64;
            row_a
                .cmp(&row_b)
                .then_with(|| a.center_x.partial_cmp(&b.center_x).unwrap_or(Ordering::Equal))
        });

        let combined_text = text_boxes
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let (top_left_x, top_left_y) = if text_boxes.is_empty() {
            (0.0, 0.0)
        } else {
            text_boxes.iter().fold((f32::INFINITY, f32::INFINITY), |(x, y), b| {
                let (bx, by) = b.top_left();
                (x.min(bx), y.min(by))
            })
        };

        Self {
            text_boxes,
            combined_text,
            top_left_x,
            top_left_y,
        }
    }

    pub fn text_boxes(&self) -> &[TextBox] {
        &self.text_boxes
    }

    /// Space-joined text of the boxes in reading order.
    pub fn combined_text(&self) -> &str {
        &self.combined_text
    }

    pub fn top_left(&self) -> (f32, f32) {
        (self.top_left_x, self.top_left_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(text: &str, confidence: f32) -> RawDetection {
        RawDetection {
            bbox: [0.0, 0.0, 10.0, 0.0, 10.0, 5.0, 0.0, 5.0],
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_text_box_geometry() {
        let b = TextBox::new("  脂質 8g ", [10.0, 20.0, 50.0, 22.0, 48.0, 40.0, 8.0, 38.0], 0.9);
        assert_eq!(b.text(), "脂質 8g");
        assert_eq!(b.center(), (29.0, 30.0));
        assert_eq!(b.width(), 42.0);
        assert_eq!(b.height(), 20.0);
        assert_eq!(b.top_left(), (10.0, 20.0));
    }

    #[test]
    fn test_build_text_boxes_filters() {
        let detections = vec![
            raw("energy 250kcal", 0.9),
            raw("noise", 0.05),
            raw("   ", 0.99),
            raw("fat 8g", 0.1),
        ];
        let detected = build_text_boxes(detections, 480, 0.1);
        let texts: Vec<_> = detected.boxes.iter().map(|b| b.text()).collect();
        assert_eq!(texts, vec!["energy 250kcal", "fat 8g"]);
        assert_eq!(detected.image_height, 480);
    }

    #[test]
    fn test_block_orders_boxes_and_joins_text() {
        let boxes = vec![
            TextBox::from_rect("15g", 120.0, 102.0, 30.0, 12.0, 0.9),
            TextBox::from_rect("たんぱく質", 10.0, 100.0, 80.0, 12.0, 0.9),
            TextBox::from_rect("(1食あたり)", 10.0, 140.0, 80.0, 12.0, 0.9),
        ];
        let block = SemanticBlock::new(boxes, 20.0);
        assert_eq!(block.combined_text(), "たんぱく質 15g (1食あたり)");
        assert_eq!(block.top_left(), (10.0, 100.0));
        assert_eq!(block.text_boxes().len(), 3);
    }
}
