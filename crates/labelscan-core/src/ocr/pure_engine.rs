//! Text detector backed by `pure-onnx-ocr`.

use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::ModelConfig;

use super::{RawDetection, TextDetector};

/// Detector running PaddleOCR-format models through `pure-onnx-ocr`.
pub struct PureOnnxDetector {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl PureOnnxDetector {
    /// Load detection, recognition and dictionary files from the configured model directory.
    pub fn load(models: &ModelConfig) -> Result<Self, OcrError> {
        let missing = models.missing_files();
        if !missing.is_empty() {
            return Err(OcrError::ModelLoad(format!(
                "model files not found: {}",
                missing.join(", ")
            )));
        }

        let (det_path, rec_path, dict_path) = models.paths();
        let start = Instant::now();

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!(
            "Loaded text detector from {} ({}) in {}ms",
            models.model_dir.display(),
            models.recognition_model,
            start.elapsed().as_millis()
        );

        Ok(Self { engine })
    }
}

impl TextDetector for PureOnnxDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<RawDetection>, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Detecting text in {}x{} image", width, height);

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Detection(format!("pure-onnx-ocr: {}", e)))?;

        let detections: Vec<RawDetection> = results
            .iter()
            .map(|r| RawDetection {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: r.text.replace("[UNK]", ""),
                confidence: r.confidence,
            })
            .collect();

        info!(
            "Detected {} text regions in {}ms",
            detections.len(),
            start.elapsed().as_millis()
        );

        Ok(detections)
    }
}

/// Flatten the first four exterior points of a polygon.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
