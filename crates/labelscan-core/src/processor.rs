//! End-to-end nutrition label processing.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use image::{DynamicImage, GenericImageView, ImageReader};
use tracing::{debug, error, info, warn};

use crate::error::{OcrError, PipelineError};
use crate::models::config::LabelScanConfig;
use crate::models::nutrition::{NutrientValueMap, ProcessingResult, ValidationResult};
use crate::nutrition::{NutritionExtractor, NutritionValidator};
use crate::ocr::{build_text_boxes, ImagePreprocessor, RawDetection, SemanticBlockBuilder, TextDetector};

#[cfg(feature = "native")]
use crate::ocr::PureOnnxDetector;

/// Input accepted by [`NutritionOcrProcessor::process_nutrition_label`].
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    /// Already decoded image.
    Image(DynamicImage),
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        Self::Image(image)
    }
}

impl ImageSource {
    fn load(self) -> Result<DynamicImage, PipelineError> {
        match self {
            Self::Path(path) => ImageReader::open(&path)?
                .with_guessed_format()?
                .decode()
                .map_err(|e| PipelineError::ImageLoad(format!("{}: {}", path.display(), e))),
            Self::Bytes(bytes) => {
                image::load_from_memory(&bytes).map_err(|e| PipelineError::ImageLoad(e.to_string()))
            }
            Self::Image(image) => Ok(image),
        }
    }
}

type DetectorFactory<D> = Box<dyn Fn() -> Result<D, OcrError> + Send + Sync>;

/// Values read from one label before the success gate.
struct LabelReading {
    nutrition: NutrientValueMap,
    validation: ValidationResult,
    detected_texts: Vec<String>,
}

/// Runs preprocessing, detection, block building, extraction and validation.
///
/// The detector is created on first use and reused afterwards. Concurrent
/// callers share one detector; its calls are serialized.
pub struct NutritionOcrProcessor<D: TextDetector> {
    config: LabelScanConfig,
    preprocessor: ImagePreprocessor,
    block_builder: SemanticBlockBuilder,
    extractor: NutritionExtractor,
    validator: NutritionValidator,
    factory: DetectorFactory<D>,
    detector: Mutex<Option<D>>,
}

impl<D: TextDetector> NutritionOcrProcessor<D> {
    /// Create a processor that builds its detector with `factory` on first use.
    ///
    /// A failed construction is reported in the result and retried on the next call.
    pub fn new<F>(config: LabelScanConfig, factory: F) -> Self
    where
        F: Fn() -> Result<D, OcrError> + Send + Sync + 'static,
    {
        Self {
            preprocessor: ImagePreprocessor::new().with_config(config.preprocess.clone()),
            block_builder: SemanticBlockBuilder::new().with_config(config.blocks.clone()),
            extractor: NutritionExtractor::new().with_config(&config.extraction),
            validator: NutritionValidator::new(),
            factory: Box::new(factory),
            detector: Mutex::new(None),
            config,
        }
    }

    /// Create a processor around an already constructed detector.
    pub fn with_detector(config: LabelScanConfig, detector: D) -> Self {
        let processor = Self::new(config, || {
            Err(OcrError::ModelLoad("detector cannot be re-created".to_string()))
        });
        *processor.detector.lock().unwrap_or_else(PoisonError::into_inner) = Some(detector);
        processor
    }

    /// Whether the detector has been constructed.
    pub fn is_initialized(&self) -> bool {
        self.detector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Construct the detector now instead of on the first label.
    pub fn initialize(&self) -> Result<(), OcrError> {
        let mut guard = self.detector.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(self.create_detector()?);
        }
        Ok(())
    }

    /// Process one nutrition label image.
    ///
    /// Never panics and never returns an error: every failure becomes a
    /// [`ProcessingResult`] with `success == false`.
    pub fn process_nutrition_label(&self, image: impl Into<ImageSource>) -> ProcessingResult {
        let start = Instant::now();
        let source = image.into();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.read_label(source)));

        let result = match outcome {
            Ok(Ok(reading)) if reading.nutrition.has_core_nutrient() => ProcessingResult::success(
                &reading.nutrition,
                reading.validation,
                reading.detected_texts,
            ),
            Ok(Ok(reading)) => {
                warn!(
                    "No core nutrients in {} detected texts",
                    reading.detected_texts.len()
                );
                ProcessingResult::failure(
                    PipelineError::NoNutrientsRecognized.to_string(),
                    Some(reading.nutrition),
                    reading.detected_texts,
                )
            }
            Ok(Err(PipelineError::NoTextDetected)) => {
                warn!("No text detected in image");
                ProcessingResult::failure(PipelineError::NoTextDetected.to_string(), None, Vec::new())
            }
            Ok(Err(e)) => {
                error!("Label processing failed: {}", e);
                ProcessingResult::failure(e.to_string(), None, Vec::new())
            }
            Err(_) => {
                error!("Label processing panicked");
                ProcessingResult::failure("internal error while processing image", None, Vec::new())
            }
        };

        info!(
            "Processed label in {}ms (success: {})",
            start.elapsed().as_millis(),
            result.success
        );

        result
    }

    fn read_label(&self, source: ImageSource) -> Result<LabelReading, PipelineError> {
        let image = source.load()?;
        let (width, height) = image.dimensions();
        debug!("Loaded {}x{} image", width, height);

        let gray = self.preprocessor.preprocess(&image)?;
        let image_height = gray.height();
        let detections = self.detect(&DynamicImage::ImageLuma8(gray))?;

        let detected = build_text_boxes(
            detections,
            image_height,
            self.config.detection.min_confidence,
        );
        if detected.boxes.is_empty() {
            return Err(PipelineError::NoTextDetected);
        }
        debug!("{} text boxes after filtering", detected.boxes.len());

        let detected_texts = detected
            .boxes
            .iter()
            .take(self.config.detection.max_diagnostic_texts)
            .map(|b| b.text().to_string())
            .collect();

        let blocks = self
            .block_builder
            .build_blocks(detected.boxes, detected.image_height);
        let nutrition = self.extractor.extract_from_blocks(&blocks);
        let validation = self.validator.validate(&nutrition);

        if !validation.is_valid {
            debug!("Validation produced {} warnings", validation.warnings.len());
        }

        Ok(LabelReading {
            nutrition,
            validation,
            detected_texts,
        })
    }

    fn create_detector(&self) -> Result<D, OcrError> {
        info!("Initializing text detector");
        let start = Instant::now();
        let detector = (self.factory)()?;
        info!("Text detector ready in {}ms", start.elapsed().as_millis());
        Ok(detector)
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, OcrError> {
        let mut guard = self.detector.lock().unwrap_or_else(PoisonError::into_inner);

        if guard.is_none() {
            *guard = Some(self.create_detector()?);
        }
        let Some(detector) = guard.as_mut() else {
            return Err(OcrError::Detection("text detector unavailable".to_string()));
        };

        match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(image))) {
            Ok(result) => result,
            Err(_) => {
                // Rebuild on the next call rather than reuse a detector in an unknown state.
                *guard = None;
                Err(OcrError::Detection("detector panicked".to_string()))
            }
        }
    }
}

#[cfg(feature = "native")]
impl NutritionOcrProcessor<PureOnnxDetector> {
    /// Processor backed by the bundled ONNX models named in `config.models`.
    ///
    /// Model files are only read when the first label is processed.
    pub fn with_models(config: LabelScanConfig) -> Self {
        let models = config.models.clone();
        Self::new(config, move || PureOnnxDetector::load(&models))
    }
}
