//! Core library for nutrition label OCR.
//!
//! This crate provides:
//! - Image preprocessing (inversion, deskew, sharpening, denoising, CLAHE)
//! - A text detector seam with a `pure-onnx-ocr` implementation
//! - Spatial clustering of text boxes into semantic blocks
//! - OCR correction and rule-based nutrient extraction
//! - Cross-field validation of the extracted values

pub mod error;
pub mod models;
pub mod nutrition;
pub mod ocr;
pub mod processor;

pub use error::{LabelScanError, OcrError, PipelineError, Result};
pub use models::{
    LabelScanConfig, Nutrient, NutrientValueMap, ProcessingResult, ValidationResult,
    ValidationWarning, WarningKind,
};
pub use nutrition::{NutritionExtractor, NutritionValidator, OcrCorrector};
pub use ocr::{RawDetection, SemanticBlock, SemanticBlockBuilder, TextBox, TextDetector};
#[cfg(feature = "native")]
pub use ocr::PureOnnxDetector;
pub use processor::{ImageSource, NutritionOcrProcessor};
