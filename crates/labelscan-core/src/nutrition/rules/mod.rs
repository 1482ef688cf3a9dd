//! Rule tables for nutrient extraction and OCR correction.

pub mod correction;
pub mod patterns;

pub use correction::{CorrectionTables, DecimalRepair, OcrCorrector, DEFAULT_TABLES};
pub use patterns::*;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::nutrition::Nutrient;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// One pattern of a nutrient rule.
#[derive(Debug, Clone, Copy)]
pub struct RulePattern {
    pub regex: &'static Regex,
    pub confidence: f32,
}

/// Ordered patterns for one nutrient, most reliable first.
#[derive(Debug, Clone)]
pub struct NutrientRule {
    pub nutrient: Nutrient,
    pub patterns: Vec<RulePattern>,
    /// Captures followed by text matching this are discarded.
    pub reject_suffix: Option<&'static Regex>,
}

impl NutrientRule {
    fn new(nutrient: Nutrient, patterns: &[(&'static Regex, f32)]) -> Self {
        Self {
            nutrient,
            patterns: patterns
                .iter()
                .map(|&(regex, confidence)| RulePattern { regex, confidence })
                .collect(),
            reject_suffix: None,
        }
    }

    fn rejecting(mut self, suffix: &'static Regex) -> Self {
        self.reject_suffix = Some(suffix);
        self
    }

    /// Bind the rule to a corrector for value parsing.
    pub fn matcher<'a>(&'a self, corrector: &'a OcrCorrector) -> RuleMatcher<'a> {
        RuleMatcher {
            rule: self,
            corrector,
        }
    }
}

// Unit-qualified matches are the most reliable, bare numbers before a unit the least.
const WITH_UNIT: f32 = 0.95;
const BEFORE_UNIT: f32 = 0.9;
const NAME_ONLY: f32 = 0.8;
const UNIT_ONLY: f32 = 0.6;

lazy_static! {
    /// Extraction rules for every nutrient, in output order.
    pub static ref NUTRIENT_RULES: Vec<NutrientRule> = vec![
        NutrientRule::new(Nutrient::Calories, &[
            (&CALORIES_WITH_UNIT, WITH_UNIT),
            (&CALORIES_BEFORE_UNIT, BEFORE_UNIT),
            (&CALORIES_NAME_ONLY, NAME_ONLY),
            (&CALORIES_UNIT_ONLY, UNIT_ONLY),
        ])
        .rejecting(&KILOJOULE_SUFFIX),
        NutrientRule::new(Nutrient::Protein, &[
            (&PROTEIN_WITH_UNIT, WITH_UNIT),
            (&PROTEIN_NAME_ONLY, NAME_ONLY),
        ]),
        NutrientRule::new(Nutrient::Fat, &[
            (&FAT_WITH_UNIT, WITH_UNIT),
            (&FAT_NAME_ONLY, NAME_ONLY),
        ]),
        NutrientRule::new(Nutrient::Carbohydrates, &[
            (&CARBOHYDRATES_WITH_UNIT, WITH_UNIT),
            (&CARBOHYDRATES_NAME_ONLY, NAME_ONLY),
        ]),
        NutrientRule::new(Nutrient::Sugar, &[
            (&SUGAR_WITH_UNIT, WITH_UNIT),
            (&SUGAR_NAME_ONLY, NAME_ONLY),
        ]),
        NutrientRule::new(Nutrient::DietaryFiber, &[
            (&FIBER_WITH_UNIT, WITH_UNIT),
            (&FIBER_NAME_ONLY, NAME_ONLY),
        ]),
        NutrientRule::new(Nutrient::Sodium, &[
            (&SALT_EQUIVALENT, WITH_UNIT),
            (&SODIUM_MG, WITH_UNIT),
            (&SODIUM_SYMBOL_MG, WITH_UNIT),
        ]),
        NutrientRule::new(Nutrient::Calcium, &[
            (&CALCIUM_MG, WITH_UNIT),
            (&CALCIUM_SYMBOL_MG, WITH_UNIT),
        ]),
        NutrientRule::new(Nutrient::Iron, &[
            (&IRON_MG, WITH_UNIT),
            (&IRON_SYMBOL_MG, WITH_UNIT),
        ]),
        NutrientRule::new(Nutrient::VitaminA, &[(&VITAMIN_A_UG, WITH_UNIT)]),
        NutrientRule::new(Nutrient::VitaminB1, &[(&VITAMIN_B1_MG, WITH_UNIT)]),
        NutrientRule::new(Nutrient::VitaminB2, &[(&VITAMIN_B2_MG, WITH_UNIT)]),
        NutrientRule::new(Nutrient::VitaminC, &[(&VITAMIN_C_MG, WITH_UNIT)]),
    ];
}

/// A nutrient rule paired with the corrector that parses its captures.
pub struct RuleMatcher<'a> {
    rule: &'a NutrientRule,
    corrector: &'a OcrCorrector,
}

impl RuleMatcher<'_> {
    fn accept(
        &self,
        text: &str,
        caps: &regex::Captures<'_>,
        confidence: f32,
    ) -> Option<ExtractionMatch<f64>> {
        let (full, group) = (caps.get(0)?, caps.get(1)?);
        if self
            .rule
            .reject_suffix
            .is_some_and(|suffix| suffix.is_match(&text[group.end()..]))
        {
            return None;
        }

        let value = self.corrector.extract_numeric_value(group.as_str())?;
        Some(ExtractionMatch::new(value, confidence, full.as_str()).with_position(full.start(), full.end()))
    }
}

impl FieldExtractor for RuleMatcher<'_> {
    type Output = ExtractionMatch<f64>;

    /// First pattern, in priority order, whose capture parses to a value.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.rule.patterns.iter().find_map(|pattern| {
            let caps = pattern.regex.captures(text)?;
            self.accept(text, &caps, pattern.confidence)
        })
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for pattern in &self.rule.patterns {
            for caps in pattern.regex.captures_iter(text) {
                if let Some(m) = self.accept(text, &caps, pattern.confidence) {
                    results.push(m);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(nutrient: Nutrient) -> &'static NutrientRule {
        NUTRIENT_RULES.iter().find(|r| r.nutrient == nutrient).unwrap()
    }

    #[test]
    fn test_every_nutrient_has_a_rule() {
        assert_eq!(NUTRIENT_RULES.len(), Nutrient::ALL.len());
        for (rule, nutrient) in NUTRIENT_RULES.iter().zip(Nutrient::ALL) {
            assert_eq!(rule.nutrient, nutrient);
            assert!(!rule.patterns.is_empty());
        }
    }

    #[test]
    fn test_unit_pattern_wins_over_name_only() {
        let corrector = OcrCorrector::new();
        let m = rule(Nutrient::Protein).matcher(&corrector).extract("たんぱく質 15g").unwrap();
        assert_eq!(m.value, 15.0);
        assert_eq!(m.confidence, WITH_UNIT);
        assert_eq!(m.position, Some((0, "たんぱく質 15g".len())));

        let m = rule(Nutrient::Protein).matcher(&corrector).extract("たんぱく質 15").unwrap();
        assert_eq!(m.value, 15.0);
        assert_eq!(m.confidence, NAME_ONLY);
    }

    #[test]
    fn test_unparseable_capture_falls_through() {
        let corrector = OcrCorrector::new();
        // "fat dl" captures "dl" for both patterns; neither parses.
        assert!(rule(Nutrient::Fat).matcher(&corrector).extract("fat dl").is_none());
    }

    #[test]
    fn test_kilojoule_capture_is_rejected() {
        let corrector = OcrCorrector::new();
        let calories = rule(Nutrient::Calories).matcher(&corrector);
        assert!(calories.extract("エネルギー 1046kJ").is_none());
        assert!(calories.extract("Energy 1046 kJ").is_none());
        assert_eq!(calories.extract("Energy 1046kJ 250kcal").unwrap().value, 250.0);
        assert_eq!(calories.extract("エネルギー 250").unwrap().value, 250.0);
    }

    #[test]
    fn test_extract_all() {
        let corrector = OcrCorrector::new();
        let matches = rule(Nutrient::Calories)
            .matcher(&corrector)
            .extract_all("250kcal 300kcal");
        let values: Vec<f64> = matches.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![250.0, 300.0]);
        assert!(matches.iter().all(|m| m.confidence == UNIT_ONLY));
    }
}
