//! Cross-field consistency checks for extracted nutrition values.

use crate::models::nutrition::{
    Nutrient, NutrientValueMap, ValidationResult, ValidationWarning, WarningKind,
};

/// Atwater energy factors (kcal per gram).
const PROTEIN_KCAL_PER_G: f64 = 4.0;
const FAT_KCAL_PER_G: f64 = 9.0;
const CARBOHYDRATE_KCAL_PER_G: f64 = 4.0;

/// Plausible per-100 g ranges.
const RANGES: [(Nutrient, f64, f64); 4] = [
    (Nutrient::Calories, 0.0, 900.0),
    (Nutrient::Protein, 0.0, 100.0),
    (Nutrient::Fat, 0.0, 100.0),
    (Nutrient::Carbohydrates, 0.0, 100.0),
];

/// Validator for extracted nutrition values.
///
/// Absent values are skipped by every check rather than treated as zero.
#[derive(Debug, Clone)]
pub struct NutritionValidator {
    /// Allowed relative deviation between stated and calculated energy.
    energy_tolerance: f64,
    /// Allowed absolute gap (g) between carbohydrate and sugar + fiber.
    carbs_tolerance: f64,
}

impl NutritionValidator {
    pub fn new() -> Self {
        Self {
            energy_tolerance: 0.2,
            carbs_tolerance: 1.0,
        }
    }

    pub fn with_energy_tolerance(mut self, tolerance: f64) -> Self {
        self.energy_tolerance = tolerance;
        self
    }

    pub fn with_carbs_tolerance(mut self, tolerance: f64) -> Self {
        self.carbs_tolerance = tolerance;
        self
    }

    pub fn validate(&self, nutrition: &NutrientValueMap) -> ValidationResult {
        let mut warnings = Vec::new();

        let calculated_calories = calculate_calories(nutrition);
        if let (Some(calculated), Some(stated)) = (calculated_calories, nutrition.calories) {
            self.check_energy(stated, calculated, &mut warnings);
        }

        self.check_carbs(nutrition, &mut warnings);
        check_ranges(nutrition, &mut warnings);

        ValidationResult {
            is_valid: warnings.is_empty(),
            warnings,
            calculated_calories,
        }
    }

    fn check_energy(&self, stated: f64, calculated: f64, warnings: &mut Vec<ValidationWarning>) {
        if calculated <= 0.0 {
            return;
        }

        let ratio = stated / calculated;
        if ratio < 1.0 - self.energy_tolerance || ratio > 1.0 + self.energy_tolerance {
            warnings.push(ValidationWarning {
                kind: WarningKind::EnergyMismatch,
                message: format!(
                    "Stated energy {:.1} kcal differs from calculated {:.1} kcal (ratio {:.2})",
                    stated, calculated, ratio
                ),
                field: Some(Nutrient::Calories),
                detail: Some(ratio),
            });
        }
    }

    fn check_carbs(&self, nutrition: &NutrientValueMap, warnings: &mut Vec<ValidationWarning>) {
        let (Some(carbs), Some(sugar), Some(fiber)) =
            (nutrition.carbohydrates, nutrition.sugar, nutrition.dietary_fiber)
        else {
            return;
        };

        let difference = carbs - (sugar + fiber);
        if difference.abs() > self.carbs_tolerance {
            warnings.push(ValidationWarning {
                kind: WarningKind::CarbsMismatch,
                message: format!(
                    "Carbohydrates {:.1} g do not match sugar {:.1} g + fiber {:.1} g",
                    carbs, sugar, fiber
                ),
                field: Some(Nutrient::Carbohydrates),
                detail: Some(difference),
            });
        }
    }
}

impl Default for NutritionValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Atwater estimate; `None` unless protein, fat and carbohydrates are all known.
pub fn calculate_calories(nutrition: &NutrientValueMap) -> Option<f64> {
    let protein = nutrition.protein?;
    let fat = nutrition.fat?;
    let carbs = nutrition.carbohydrates?;

    Some(protein * PROTEIN_KCAL_PER_G + fat * FAT_KCAL_PER_G + carbs * CARBOHYDRATE_KCAL_PER_G)
}

fn check_ranges(nutrition: &NutrientValueMap, warnings: &mut Vec<ValidationWarning>) {
    for (nutrient, min, max) in RANGES {
        let Some(value) = nutrition.get(nutrient) else {
            continue;
        };
        if value < min || value > max {
            warnings.push(ValidationWarning {
                kind: WarningKind::RangeError,
                message: format!(
                    "{} value {} is outside the expected range {}-{}",
                    nutrient, value, min, max
                ),
                field: Some(nutrient),
                detail: Some(value),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(calories: Option<f64>, protein: Option<f64>, fat: Option<f64>, carbs: Option<f64>) -> NutrientValueMap {
        NutrientValueMap {
            calories,
            protein,
            fat,
            carbohydrates: carbs,
            ..Default::default()
        }
    }

    #[test]
    fn test_consistent_label_is_valid() {
        // 10*4 + 5*9 + 20*4 = 165
        let result = NutritionValidator::new().validate(&map(Some(170.0), Some(10.0), Some(5.0), Some(20.0)));
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
        assert_eq!(result.calculated_calories, Some(165.0));
    }

    #[test]
    fn test_energy_mismatch_and_range_error() {
        let result = NutritionValidator::new().validate(&map(Some(1000.0), Some(10.0), Some(5.0), Some(20.0)));

        assert!(!result.is_valid);
        assert_eq!(result.calculated_calories, Some(165.0));

        let kinds: Vec<WarningKind> = result.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::EnergyMismatch, WarningKind::RangeError]);

        let ratio = result.warnings[0].detail.unwrap();
        assert!((ratio - 1000.0 / 165.0).abs() < 1e-9);
        assert_eq!(result.warnings[1].field, Some(Nutrient::Calories));
        assert_eq!(result.warnings[1].detail, Some(1000.0));
    }

    #[test]
    fn test_energy_tolerance_boundaries() {
        let validator = NutritionValidator::new();
        // calculated = 100
        let low = validator.validate(&map(Some(81.0), Some(25.0), Some(0.0), Some(0.0)));
        let high = validator.validate(&map(Some(119.0), Some(25.0), Some(0.0), Some(0.0)));
        let under = validator.validate(&map(Some(79.0), Some(25.0), Some(0.0), Some(0.0)));
        let over = validator.validate(&map(Some(121.0), Some(25.0), Some(0.0), Some(0.0)));

        assert!(low.is_valid);
        assert!(high.is_valid);
        assert_eq!(under.warnings[0].kind, WarningKind::EnergyMismatch);
        assert_eq!(over.warnings[0].kind, WarningKind::EnergyMismatch);
    }

    #[test]
    fn test_custom_tolerances() {
        // calculated = 100, carbs - (sugar + fiber) = 2
        let mut nutrition = map(Some(140.0), Some(0.0), Some(0.0), Some(25.0));
        nutrition.sugar = Some(20.0);
        nutrition.dietary_fiber = Some(3.0);

        let strict = NutritionValidator::new().validate(&nutrition);
        let kinds: Vec<WarningKind> = strict.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::EnergyMismatch, WarningKind::CarbsMismatch]);

        let loose = NutritionValidator::new()
            .with_energy_tolerance(0.5)
            .with_carbs_tolerance(2.5)
            .validate(&nutrition);
        assert!(loose.is_valid);
    }

    #[test]
    fn test_zero_calculated_energy_skips_ratio() {
        let result = NutritionValidator::new().validate(&map(Some(5.0), Some(0.0), Some(0.0), Some(0.0)));
        assert!(result.is_valid);
        assert_eq!(result.calculated_calories, Some(0.0));
    }

    #[test]
    fn test_carbs_mismatch() {
        let mut nutrition = map(None, None, None, Some(20.0));
        nutrition.sugar = Some(10.0);
        nutrition.dietary_fiber = Some(2.0);

        let result = NutritionValidator::new().validate(&nutrition);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::CarbsMismatch);
        assert_eq!(result.warnings[0].detail, Some(8.0));

        nutrition.sugar = Some(17.5);
        assert!(NutritionValidator::new().validate(&nutrition).is_valid);
    }

    #[test]
    fn test_absent_fields_are_skipped() {
        let result = NutritionValidator::new().validate(&map(Some(1000.0), None, Some(5.0), None));
        assert_eq!(result.calculated_calories, None);
        // Only the calorie range check applies.
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::RangeError);

        let empty = NutritionValidator::new().validate(&NutrientValueMap::new());
        assert!(empty.is_valid);
    }

    #[test]
    fn test_protein_out_of_range() {
        let result = NutritionValidator::new().validate(&map(None, Some(150.0), None, None));
        assert_eq!(result.warnings[0].field, Some(Nutrient::Protein));
    }
}
