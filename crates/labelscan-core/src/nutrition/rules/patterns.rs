//! Regex patterns for nutrition label extraction.
//!
//! Nutrient patterns are case-insensitive and capture the numeric part in
//! group 1. The capture class admits glyphs commonly misread for digits
//! (`O`, `Q`, `D`, `l`, `I`, `|`); the corrector turns them back into digits.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Inline multi-nutrient lines ("エネルギー16kcal、たんぱく質1.6g")
    pub static ref INLINE_DELIMITERS: Regex = Regex::new(r"[、，,]").unwrap();

    // Plain number, not touching confusable glyphs on either side
    pub static ref STRICT_NUMBER: Regex = Regex::new(
        r"(?:^|[^0-9OoQDlI|.,])([0-9]+(?:[.,][0-9]+)*)(?:$|[^0-9OoQDlI|.,])"
    ).unwrap();

    // Number that may contain glyphs misread for digits
    pub static ref CONFUSABLE_NUMBER: Regex = Regex::new(
        r"[0-9OoQDlI|]+(?:[.,][0-9OoQDlI|]+)*"
    ).unwrap();

    // Energy
    pub static ref CALORIES_WITH_UNIT: Regex = Regex::new(
        r"(?i)(?:エネルギー|熱量|カロリー|energy|calories|calorie)[:\s：]*([0-9OoQDlI|.,]+)\s*(?:kcal|キロカロリー|㎉)"
    ).unwrap();

    // Energy stated in kJ first, kcal later on the same line
    pub static ref CALORIES_BEFORE_UNIT: Regex = Regex::new(
        r"(?i)(?:エネルギー|熱量|カロリー|energy|calories|calorie).*?([0-9OoQDlI|.,]+)\s*(?:kcal|キロカロリー|㎉)"
    ).unwrap();

    pub static ref CALORIES_NAME_ONLY: Regex = Regex::new(
        r"(?i)(?:エネルギー|熱量|カロリー|energy|calories|calorie)[:\s：]*([0-9OoQDlI|.,]+)"
    ).unwrap();

    // Energy value stated in kilojoules
    pub static ref KILOJOULE_SUFFIX: Regex = Regex::new(r"(?i)^\s*kj").unwrap();

    pub static ref CALORIES_UNIT_ONLY: Regex = Regex::new(
        r"(?i)([0-9OoQDlI|.,]+)\s*(?:kcal|キロカロリー|㎉)"
    ).unwrap();

    // Macronutrients
    pub static ref PROTEIN_WITH_UNIT: Regex = Regex::new(
        r"(?i)(?:たんぱく質|タンパク質|蛋白質|たん白質|protein)[:\s：]*([0-9OoQDlI|.,]+)\s*g"
    ).unwrap();

    pub static ref PROTEIN_NAME_ONLY: Regex = Regex::new(
        r"(?i)(?:たんぱく質|タンパク質|蛋白質|たん白質|protein)[:\s：]*([0-9OoQDlI|.,]+)"
    ).unwrap();

    pub static ref FAT_WITH_UNIT: Regex = Regex::new(
        r"(?i)(?:脂質|total\s+fat|fat|lipids?)[:\s：]*([0-9OoQDlI|.,]+)\s*g"
    ).unwrap();

    pub static ref FAT_NAME_ONLY: Regex = Regex::new(
        r"(?i)(?:脂質|total\s+fat|fat|lipids?)[:\s：]*([0-9OoQDlI|.,]+)"
    ).unwrap();

    pub static ref CARBOHYDRATES_WITH_UNIT: Regex = Regex::new(
        r"(?i)(?:炭水化物|carbohydrates?|carbs?)[:\s：]*([0-9OoQDlI|.,]+)\s*g"
    ).unwrap();

    pub static ref CARBOHYDRATES_NAME_ONLY: Regex = Regex::new(
        r"(?i)(?:炭水化物|carbohydrates?|carbs?)[:\s：]*([0-9OoQDlI|.,]+)"
    ).unwrap();

    pub static ref SUGAR_WITH_UNIT: Regex = Regex::new(
        r"(?i)(?:糖質|糖類|sugars?)[:\s：]*([0-9OoQDlI|.,]+)\s*g"
    ).unwrap();

    pub static ref SUGAR_NAME_ONLY: Regex = Regex::new(
        r"(?i)(?:糖質|糖類|sugars?)[:\s：]*([0-9OoQDlI|.,]+)"
    ).unwrap();

    pub static ref FIBER_WITH_UNIT: Regex = Regex::new(
        r"(?i)(?:食物繊維|dietary\s*fib(?:er|re)|fib(?:er|re))[:\s：]*([0-9OoQDlI|.,]+)\s*g"
    ).unwrap();

    pub static ref FIBER_NAME_ONLY: Regex = Regex::new(
        r"(?i)(?:食物繊維|dietary\s*fib(?:er|re)|fib(?:er|re))[:\s：]*([0-9OoQDlI|.,]+)"
    ).unwrap();

    // Minerals
    pub static ref SALT_EQUIVALENT: Regex = Regex::new(
        r"(?i)(?:食塩相当量|salt)[:\s：]*([0-9OoQDlI|.,]+)\s*g"
    ).unwrap();

    pub static ref SODIUM_MG: Regex = Regex::new(
        r"(?i)(?:ナトリウム|sodium)[:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    pub static ref SODIUM_SYMBOL_MG: Regex = Regex::new(
        r"(?i)\bNa[:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    pub static ref CALCIUM_MG: Regex = Regex::new(
        r"(?i)(?:カルシウム|calcium)[:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    pub static ref CALCIUM_SYMBOL_MG: Regex = Regex::new(
        r"(?i)\bCa[:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    pub static ref IRON_MG: Regex = Regex::new(
        r"(?i)(?:鉄|iron)[:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    pub static ref IRON_SYMBOL_MG: Regex = Regex::new(
        r"(?i)\bFe[:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    // Vitamins
    pub static ref VITAMIN_A_UG: Regex = Regex::new(
        r"(?i)(?:ビタミン|vitamin\s*)[AＡ][:\s：]*([0-9OoQDlI|.,]+)\s*(?:μg|µg|mcg|ug)"
    ).unwrap();

    pub static ref VITAMIN_B1_MG: Regex = Regex::new(
        r"(?i)(?:ビタミン|vitamin\s*)[BＢ]\s*[1１][:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    pub static ref VITAMIN_B2_MG: Regex = Regex::new(
        r"(?i)(?:ビタミン|vitamin\s*)[BＢ]\s*[2２][:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();

    pub static ref VITAMIN_C_MG: Regex = Regex::new(
        r"(?i)(?:ビタミン|vitamin\s*)[CＣ][:\s：]*([0-9OoQDlI|.,]+)\s*mg"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
        re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
    }

    #[test]
    fn test_calorie_patterns() {
        assert_eq!(capture(&CALORIES_WITH_UNIT, "エネルギー 250kcal"), Some("250"));
        assert_eq!(capture(&CALORIES_WITH_UNIT, "熱量：49 kcal"), Some("49"));
        assert_eq!(capture(&CALORIES_WITH_UNIT, "Energy 1046kJ 250kcal"), None);
        assert_eq!(capture(&CALORIES_BEFORE_UNIT, "Energy 1046kJ 250kcal"), Some("250"));
        assert_eq!(capture(&CALORIES_NAME_ONLY, "カロリー 120"), Some("120"));
        assert_eq!(capture(&CALORIES_UNIT_ONLY, "16KCAL"), Some("16"));
        assert!(KILOJOULE_SUFFIX.is_match(" kJ"));
        assert!(!KILOJOULE_SUFFIX.is_match("kcal"));
    }

    #[test]
    fn test_confusable_capture() {
        assert_eq!(capture(&FAT_WITH_UNIT, "脂質 Og"), Some("O"));
        assert_eq!(capture(&PROTEIN_WITH_UNIT, "たんぱく質 l5.2g"), Some("l5.2"));
    }

    #[test]
    fn test_mineral_and_vitamin_patterns() {
        assert_eq!(capture(&SALT_EQUIVALENT, "食塩相当量 0.3g"), Some("0.3"));
        assert_eq!(capture(&SODIUM_MG, "ナトリウム 120mg"), Some("120"));
        assert_eq!(capture(&SODIUM_SYMBOL_MG, "Na: 85mg"), Some("85"));
        assert_eq!(capture(&CALCIUM_SYMBOL_MG, "16kcal"), None);
        assert_eq!(capture(&IRON_MG, "鉄 1.2mg"), Some("1.2"));
        assert_eq!(capture(&VITAMIN_A_UG, "ビタミンＡ 150μg"), Some("150"));
        assert_eq!(capture(&VITAMIN_B1_MG, "ビタミンB1 0.3mg"), Some("0.3"));
        assert_eq!(capture(&VITAMIN_B2_MG, "ビタミンＢ２ 0.4mg"), Some("0.4"));
        assert_eq!(capture(&VITAMIN_C_MG, "Vitamin C 50mg"), Some("50"));
    }

    #[test]
    fn test_inline_split() {
        let parts: Vec<&str> = INLINE_DELIMITERS.split("a、b，c,d").collect();
        assert_eq!(parts, vec!["a", "b", "c", "d"]);
    }
}
