//! Error types for the labelscan-core library.

use thiserror::Error;

/// Main error type for the labelscan library.
#[derive(Error, Debug)]
pub enum LabelScanError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Pipeline stage error.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to image preprocessing and text detection.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load detector models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text detection failed.
    #[error("text detection failed: {0}")]
    Detection(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors that end a single label-processing run.
///
/// The orchestrator turns every variant into a failed
/// [`ProcessingResult`](crate::models::nutrition::ProcessingResult).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The image bytes could not be read or decoded.
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    /// The detector returned no usable text boxes.
    #[error("no text detected in image")]
    NoTextDetected,

    /// Text was found but none of the core nutrients could be read.
    #[error("no nutrients recognized")]
    NoNutrientsRecognized,

    /// Preprocessing or detector failure.
    #[error(transparent)]
    Ocr(#[from] OcrError),

    /// I/O failure while reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the labelscan library.
pub type Result<T> = std::result::Result<T, LabelScanError>;
