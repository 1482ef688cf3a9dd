//! Configuration structures for the label pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::LabelScanError;

/// Main configuration for the labelscan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelScanConfig {
    /// Image preprocessing configuration.
    pub preprocess: PreprocessConfig,

    /// Text detector configuration.
    pub detection: DetectionConfig,

    /// Semantic block clustering configuration.
    pub blocks: BlockConfig,

    /// Nutrient extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// Image preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Share of red pixels above which the background counts as red.
    pub red_ratio_threshold: f32,

    /// Mean brightness below which the label counts as dark-on-light inverted.
    pub dark_brightness_threshold: f32,

    /// Median skew (degrees) below which no rotation is applied.
    pub min_skew_degrees: f32,

    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,

    /// Minimum accumulator votes for a Hough line.
    pub hough_vote_threshold: u32,

    /// Weight of the original image when blending in the sharpened one.
    pub sharpen_original_weight: f32,

    /// Bilateral filter window diameter (pixels).
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,

    /// CLAHE clip limit and tile grid size.
    pub clahe_clip_limit: f32,
    pub clahe_grid: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            red_ratio_threshold: 0.25,
            dark_brightness_threshold: 100.0,
            min_skew_degrees: 0.5,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 100,
            sharpen_original_weight: 0.3,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
        }
    }
}

/// Text detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detections below this confidence are dropped (0.0 - 1.0).
    pub min_confidence: f32,

    /// Number of raw strings attached to results for diagnostics.
    pub max_diagnostic_texts: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.1,
            max_diagnostic_texts: 10,
        }
    }
}

/// Semantic block clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Neighborhood radius as a fraction of image height.
    pub eps_ratio: f32,

    /// Reading-order row bucket as a fraction of image height.
    pub row_ratio: f32,

    /// Row bucket (pixels) used to order boxes inside a block.
    pub in_block_row_height: f32,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            eps_ratio: 0.05,
            row_ratio: 0.1,
            in_block_row_height: 20.0,
        }
    }
}

/// Nutrient extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Largest value accepted for any single nutrient field.
    pub max_plausible_value: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_plausible_value: 10_000.0,
        }
    }
}

/// Model file locations for the bundled detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name. The Japanese model also reads Latin text.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "japan_rec.onnx".to_string(),
            dictionary: "japan_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// Full paths of the detection model, recognition model and dictionary.
    pub fn paths(&self) -> (PathBuf, PathBuf, PathBuf) {
        (
            self.model_dir.join(&self.detection_model),
            self.model_dir.join(&self.recognition_model),
            self.model_dir.join(&self.dictionary),
        )
    }

    /// Names of the model files missing from `model_dir`.
    pub fn missing_files(&self) -> Vec<String> {
        let (det, rec, dict) = self.paths();
        [det, rec, dict]
            .into_iter()
            .filter(|p| !p.exists())
            .map(|p| p.display().to_string())
            .collect()
    }
}

impl LabelScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, LabelScanError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            LabelScanError::Config(format!("{}: {}", path.display(), e))
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), LabelScanError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LabelScanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LabelScanConfig::default();
        assert_eq!(config.detection.min_confidence, 0.1);
        assert_eq!(config.models.recognition_model, "japan_rec.onnx");
        assert_eq!(config.blocks.eps_ratio, 0.05);
        assert_eq!(config.preprocess.clahe_grid, 8);
        assert_eq!(config.extraction.max_plausible_value, 10_000.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: LabelScanConfig =
            serde_json::from_str(r#"{"blocks": {"eps_ratio": 0.08}}"#).unwrap();
        assert_eq!(config.blocks.eps_ratio, 0.08);
        assert_eq!(config.blocks.row_ratio, 0.1);
        assert_eq!(config.preprocess.bilateral_diameter, 9);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = LabelScanConfig::default();
        config.detection.min_confidence = 0.25;
        config.models.model_dir = PathBuf::from("/opt/models");
        config.save(&path).unwrap();

        let loaded = LabelScanConfig::from_file(&path).unwrap();
        assert_eq!(loaded.detection.min_confidence, 0.25);
        assert_eq!(loaded.models.model_dir, PathBuf::from("/opt/models"));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = LabelScanConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, LabelScanError::Config(_)));
    }

    #[test]
    fn test_missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let models = ModelConfig {
            model_dir: dir.path().to_path_buf(),
            ..ModelConfig::default()
        };
        std::fs::write(dir.path().join("det.onnx"), b"").unwrap();

        let missing = models.missing_files();
        assert_eq!(missing.len(), 2);
        assert!(missing[0].ends_with("japan_rec.onnx"));
    }
}
