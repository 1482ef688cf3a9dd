//! Data models for the label pipeline.

pub mod config;
pub mod nutrition;

pub use config::LabelScanConfig;
pub use nutrition::{
    Nutrient, NutrientValueMap, ProcessingResult, ValidationResult, ValidationWarning, WarningKind,
};
