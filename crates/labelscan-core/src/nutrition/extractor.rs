//! Nutrient extraction from ordered semantic blocks.

use tracing::debug;

use crate::models::config::ExtractionConfig;
use crate::models::nutrition::{Nutrient, NutrientValueMap};
use crate::ocr::SemanticBlock;

use super::rules::{
    ExtractionMatch, FieldExtractor, NutrientRule, OcrCorrector, INLINE_DELIMITERS, NUTRIENT_RULES,
};

/// Extracted values together with the match that produced each one.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub nutrition: NutrientValueMap,
    /// Winning match per nutrient, in the order they were found.
    pub matches: Vec<(Nutrient, ExtractionMatch<f64>)>,
}

/// Rule-based nutrient extractor.
///
/// Blocks are scanned in order and each nutrient keeps the first value found,
/// so nutrients printed earlier on the label win over later repeats.
pub struct NutritionExtractor {
    corrector: OcrCorrector,
    rules: &'static [NutrientRule],
}

impl NutritionExtractor {
    pub fn new() -> Self {
        Self {
            corrector: OcrCorrector::new(),
            rules: NUTRIENT_RULES.as_slice(),
        }
    }

    pub fn with_config(mut self, config: &ExtractionConfig) -> Self {
        self.corrector = self.corrector.with_max_value(config.max_plausible_value);
        self
    }

    pub fn with_corrector(mut self, corrector: OcrCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    /// Populate a nutrient map from blocks in reading order.
    pub fn extract_from_blocks(&self, blocks: &[SemanticBlock]) -> NutrientValueMap {
        self.extract_detailed(blocks).nutrition
    }

    /// Like [`extract_from_blocks`](Self::extract_from_blocks), keeping match provenance.
    pub fn extract_detailed(&self, blocks: &[SemanticBlock]) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        for block in blocks {
            let corrected = self.corrector.correct_text(block.combined_text());

            for segment in INLINE_DELIMITERS.split(&corrected) {
                let segment = segment.trim();
                if segment.is_empty() {
                    continue;
                }
                self.extract_segment(segment, &mut report);
            }
        }

        debug!(
            "Extracted {} of {} nutrients",
            report.matches.len(),
            Nutrient::ALL.len()
        );

        report
    }

    fn extract_segment(&self, segment: &str, report: &mut ExtractionReport) {
        for rule in self.rules {
            if report.nutrition.contains(rule.nutrient) {
                continue;
            }

            if let Some(m) = rule.matcher(&self.corrector).extract(segment) {
                debug!("{} = {} from {:?}", rule.nutrient, m.value, m.source);
                report.nutrition.record(rule.nutrient, m.value);
                report.matches.push((rule.nutrient, m));
            }
        }
    }
}

impl Default for NutritionExtractor {
    fn default() -> Self {
        Self::new()
    }
}
