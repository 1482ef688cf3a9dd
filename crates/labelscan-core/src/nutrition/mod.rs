//! Nutrient extraction and validation.

mod extractor;
pub mod rules;
mod validator;

pub use extractor::{ExtractionReport, NutritionExtractor};
pub use rules::{ExtractionMatch, FieldExtractor, OcrCorrector};
pub use validator::{calculate_calories, NutritionValidator};
