//! Nutrition data models.
//!
//! [`NutrientValueMap`] keeps absence explicit (`None`) for as long as the
//! pipeline runs. Only [`ProcessingResult::success`] collapses absent values to
//! `0.0`, and it records which nutrients were collapsed in
//! [`ProcessingResult::missing`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nutrients recognized on a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Calories,
    Protein,
    Fat,
    Carbohydrates,
    Sugar,
    DietaryFiber,
    Sodium,
    Calcium,
    Iron,
    VitaminA,
    VitaminB1,
    VitaminB2,
    VitaminC,
}

impl Nutrient {
    /// All nutrients in output order.
    pub const ALL: [Nutrient; 13] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbohydrates,
        Nutrient::Sugar,
        Nutrient::DietaryFiber,
        Nutrient::Sodium,
        Nutrient::Calcium,
        Nutrient::Iron,
        Nutrient::VitaminA,
        Nutrient::VitaminB1,
        Nutrient::VitaminB2,
        Nutrient::VitaminC,
    ];

    /// Nutrients of which at least one must be read for a label to count.
    pub const CORE: [Nutrient; 4] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbohydrates,
    ];

    /// Key used in serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Carbohydrates => "carbohydrates",
            Nutrient::Sugar => "sugar",
            Nutrient::DietaryFiber => "dietary_fiber",
            Nutrient::Sodium => "sodium",
            Nutrient::Calcium => "calcium",
            Nutrient::Iron => "iron",
            Nutrient::VitaminA => "vitamin_a",
            Nutrient::VitaminB1 => "vitamin_b1",
            Nutrient::VitaminB2 => "vitamin_b2",
            Nutrient::VitaminC => "vitamin_c",
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-label nutrient values; `None` means not detected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientValueMap {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub sugar: Option<f64>,
    pub dietary_fiber: Option<f64>,
    pub sodium: Option<f64>,
    pub calcium: Option<f64>,
    pub iron: Option<f64>,
    pub vitamin_a: Option<f64>,
    pub vitamin_b1: Option<f64>,
    pub vitamin_b2: Option<f64>,
    pub vitamin_c: Option<f64>,
}

impl NutrientValueMap {
    /// Create a map with every nutrient absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for a nutrient, if detected.
    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        *self.slot(nutrient)
    }

    /// Whether a nutrient has been detected.
    pub fn contains(&self, nutrient: Nutrient) -> bool {
        self.get(nutrient).is_some()
    }

    /// Record a value unless the nutrient already has one.
    ///
    /// Returns `true` when the value was stored.
    pub fn record(&mut self, nutrient: Nutrient, value: f64) -> bool {
        let slot = self.slot_mut(nutrient);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// Nutrients still absent, in output order.
    pub fn missing(&self) -> Vec<Nutrient> {
        Nutrient::ALL
            .into_iter()
            .filter(|n| !self.contains(*n))
            .collect()
    }

    /// Whether any of calories, protein, fat or carbohydrates was read.
    pub fn has_core_nutrient(&self) -> bool {
        Nutrient::CORE.iter().any(|n| self.contains(*n))
    }

    /// Copy with every absent nutrient set to `0.0`.
    pub fn zero_filled(&self) -> Self {
        let mut filled = self.clone();
        for nutrient in Nutrient::ALL {
            filled.slot_mut(nutrient).get_or_insert(0.0);
        }
        filled
    }

    fn slot(&self, nutrient: Nutrient) -> &Option<f64> {
        match nutrient {
            Nutrient::Calories => &self.calories,
            Nutrient::Protein => &self.protein,
            Nutrient::Fat => &self.fat,
            Nutrient::Carbohydrates => &self.carbohydrates,
            Nutrient::Sugar => &self.sugar,
            Nutrient::DietaryFiber => &self.dietary_fiber,
            Nutrient::Sodium => &self.sodium,
            Nutrient::Calcium => &self.calcium,
            Nutrient::Iron => &self.iron,
            Nutrient::VitaminA => &self.vitamin_a,
            Nutrient::VitaminB1 => &self.vitamin_b1,
            Nutrient::VitaminB2 => &self.vitamin_b2,
            Nutrient::VitaminC => &self.vitamin_c,
        }
    }

    fn slot_mut(&mut self, nutrient: Nutrient) -> &mut Option<f64> {
        match nutrient {
            Nutrient::Calories => &mut self.calories,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Carbohydrates => &mut self.carbohydrates,
            Nutrient::Sugar => &mut self.sugar,
            Nutrient::DietaryFiber => &mut self.dietary_fiber,
            Nutrient::Sodium => &mut self.sodium,
            Nutrient::Calcium => &mut self.calcium,
            Nutrient::Iron => &mut self.iron,
            Nutrient::VitaminA => &mut self.vitamin_a,
            Nutrient::VitaminB1 => &mut self.vitamin_b1,
            Nutrient::VitaminB2 => &mut self.vitamin_b2,
            Nutrient::VitaminC => &mut self.vitamin_c,
        }
    }
}

/// Kind of consistency problem found by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Stated energy disagrees with the Atwater estimate.
    EnergyMismatch,
    /// Carbohydrate differs from sugar plus fiber.
    CarbsMismatch,
    /// A value lies outside its per-100 g range.
    RangeError,
}

/// Advisory warning attached to a validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    /// Offending field for range errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Nutrient>,
    /// Ratio for energy mismatches, value for range errors, difference for carbs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<f64>,
}

/// Outcome of cross-field validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub warnings: Vec<ValidationWarning>,
    /// Atwater estimate, when protein, fat and carbohydrates are all known.
    pub calculated_calories: Option<f64>,
}

/// Terminal output of one label-processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub nutrition: Option<NutrientValueMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub detected_texts: Vec<String>,
    /// Nutrients reported as `0.0` because they were not detected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<Nutrient>,
}

impl ProcessingResult {
    /// Successful result; absent nutrients are reported as `0.0` and listed in `missing`.
    pub fn success(
        nutrition: &NutrientValueMap,
        validation: ValidationResult,
        detected_texts: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            nutrition: Some(nutrition.zero_filled()),
            validation: Some(validation),
            error: None,
            detected_texts,
            missing: nutrition.missing(),
        }
    }

    /// Failed result with an error message and optional partial data.
    pub fn failure(
        error: impl Into<String>,
        nutrition: Option<NutrientValueMap>,
        detected_texts: Vec<String>,
    ) -> Self {
        Self {
            success: false,
            nutrition,
            validation: None,
            error: Some(error.into()),
            detected_texts,
            missing: Vec::new(),
        }
    }
}
