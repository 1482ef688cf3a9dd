//! Table-driven repair of common OCR misreads on nutrition labels.

use tracing::trace;

use super::patterns::{CONFUSABLE_NUMBER, STRICT_NUMBER};

/// Decimal point re-insertion for a digit run that lost its point.
///
/// A run of exactly `digits` digits followed by a misread gram glyph gets a
/// point after `integer_digits` digits. Tuned to gram amounts on labels,
/// which rarely have more than two significant digits before the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalRepair {
    pub digits: usize,
    pub integer_digits: usize,
}

/// Substitution tables used by [`OcrCorrector`].
#[derive(Debug, Clone, Copy)]
pub struct CorrectionTables {
    /// Corrupted nutrient name -> canonical name.
    pub nutrient_names: &'static [(&'static str, &'static str)],
    /// Corrupted unit token -> canonical unit.
    pub units: &'static [(&'static str, &'static str)],
    /// Glyphs the recognizer produces for a `g` directly after digits.
    pub lost_decimal_glyphs: &'static [char],
    pub decimal_repairs: &'static [DecimalRepair],
    /// Glyph -> digit or separator, applied to isolated numeric tokens only.
    pub numeric_glyphs: &'static [(char, char)],
}

const NUTRIENT_NAMES: &[(&str, &str)] = &[
    ("たんぱく貿", "たんぱく質"),
    ("タンパク貿", "タンパク質"),
    ("蛋白貿", "蛋白質"),
    ("たん白質", "たんぱく質"),
    ("たん自質", "たんぱく質"),
    ("たんぱく買", "たんぱく質"),
    ("タンパク買", "タンパク質"),
    ("たんはく質", "たんぱく質"),
    ("脂貿", "脂質"),
    ("脂買", "脂質"),
    ("脂賀", "脂質"),
    ("糖貿", "糖質"),
    ("糖買", "糖質"),
    ("炭水イヒ物", "炭水化物"),
    ("炭水化勿", "炭水化物"),
    ("炭水イ匕物", "炭水化物"),
    ("炭水仁物", "炭水化物"),
    ("炭水亿物", "炭水化物"),
    ("食物線維", "食物繊維"),
    ("食物繊椎", "食物繊維"),
    ("食物せんい", "食物繊維"),
    ("食物線椎", "食物繊維"),
    ("エネルギ一", "エネルギー"),
    ("工ネルギー", "エネルギー"),
    ("カロリ一", "カロリー"),
    ("熟量", "熱量"),
    ("然量", "熱量"),
    ("勲量", "熱量"),
    ("熱星", "熱量"),
    ("ナトリウ厶", "ナトリウム"),
    ("カルシウ厶", "カルシウム"),
    ("マグネシウ厶", "マグネシウム"),
    ("食塩相当星", "食塩相当量"),
    ("食鹽相当量", "食塩相当量"),
    ("良眞相当一", "食塩相当量"),
    ("良塩相当量", "食塩相当量"),
    ("食温相当量", "食塩相当量"),
    ("pr0tein", "protein"),
    ("prote1n", "protein"),
    ("carb0hydrate", "carbohydrate"),
    ("sodiurn", "sodium"),
    ("calciurn", "calcium"),
    ("vitarnin", "vitamin"),
];

// Full-width "ｍｇ" must precede the bare full-width "ｇ".
const UNITS: &[(&str, &str)] = &[
    ("』g", "g"),
    ("𝗀", "g"),
    ("ɡ", "g"),
    ("ｍｇ", "mg"),
    ("ｇ", "g"),
    ("kcaI", "kcal"),
    ("kca1", "kcal"),
    ("КcaI", "kcal"),
    ("kcaL", "kcal"),
    ("Kcal", "kcal"),
    ("KCal", "kcal"),
    ("KCAL", "kcal"),
    ("КcaL", "kcal"),
    ("kcaｌ", "kcal"),
    ("Mg", "mg"),
    ("MG", "mg"),
    ("m9", "mg"),
    ("mq", "mg"),
    ("mcg", "μg"),
    ("ΜG", "μg"),
    ("µg", "μg"),
];

const LOST_DECIMAL_GLYPHS: &[char] = &['』', 'ブ', '呂', 'ダ', 'グ', 'ク', 'り'];

const DECIMAL_REPAIRS: &[DecimalRepair] = &[
    DecimalRepair { digits: 2, integer_digits: 1 },
    DecimalRepair { digits: 3, integer_digits: 2 },
];

const NUMERIC_GLYPHS: &[(char, char)] = &[
    ('O', '0'),
    ('o', '0'),
    ('Q', '0'),
    ('D', '0'),
    ('l', '1'),
    ('I', '1'),
    ('|', '1'),
    ('i', '1'),
    ('S', '5'),
    ('s', '5'),
    ('B', '8'),
    ('g', '9'),
    ('q', '9'),
    ('Z', '2'),
    ('z', '2'),
    ('。', '.'),
    ('、', '.'),
    ('．', '.'),
    ('，', ','),
];

/// Tables shipped with the crate.
pub const DEFAULT_TABLES: CorrectionTables = CorrectionTables {
    nutrient_names: NUTRIENT_NAMES,
    units: UNITS,
    lost_decimal_glyphs: LOST_DECIMAL_GLYPHS,
    decimal_repairs: DECIMAL_REPAIRS,
    numeric_glyphs: NUMERIC_GLYPHS,
};

// Upper bound on substitution rounds; tables settle in one or two.
const MAX_ROUNDS: usize = 8;

/// OCR text corrector.
#[derive(Debug, Clone)]
pub struct OcrCorrector {
    tables: CorrectionTables,
    max_value: f64,
}

impl Default for OcrCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrCorrector {
    pub fn new() -> Self {
        Self {
            tables: DEFAULT_TABLES,
            max_value: 10_000.0,
        }
    }

    pub fn with_tables(mut self, tables: CorrectionTables) -> Self {
        self.tables = tables;
        self
    }

    /// Largest value [`extract_numeric_value`](Self::extract_numeric_value) accepts.
    pub fn with_max_value(mut self, max_value: f64) -> Self {
        self.max_value = max_value;
        self
    }

    /// Repair nutrient names, then units, then digit runs followed by a misread `g`.
    pub fn correct_text(&self, text: &str) -> String {
        let names = substitute(text, self.tables.nutrient_names);
        let units = substitute(&names, self.tables.units);
        let repaired = self.repair_lost_decimals(&units);

        if repaired != text {
            trace!("Corrected {:?} -> {:?}", text, repaired);
        }
        repaired
    }

    /// Map glyphs commonly confused with digits. Only for isolated numeric tokens.
    pub fn correct_numeric_value(&self, text: &str) -> String {
        text.chars()
            .map(|c| {
                self.tables
                    .numeric_glyphs
                    .iter()
                    .find(|(from, _)| *from == c)
                    .map_or(c, |&(_, to)| to)
            })
            .collect()
    }

    /// Pull the first plausible number out of a (possibly corrupted) token.
    pub fn extract_numeric_value(&self, text: &str) -> Option<f64> {
        let corrected = self.correct_text(text);

        let strict = STRICT_NUMBER
            .captures_iter(&corrected)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()));

        let whole = corrected.trim();
        let confusable = CONFUSABLE_NUMBER
            .find_iter(&corrected)
            .map(|m| m.as_str())
            .filter(|s| s.chars().any(|c| c.is_ascii_digit()) || *s == whole);

        strict
            .chain(confusable)
            .find_map(|candidate| self.parse_candidate(candidate))
    }

    fn parse_candidate(&self, candidate: &str) -> Option<f64> {
        let digits = self.correct_numeric_value(candidate);
        let normalized = normalize_separators(&digits);
        let value: f64 = normalized.parse().ok()?;

        if (0.0..=self.max_value).contains(&value) {
            Some(value)
        } else {
            None
        }
    }

    /// Turn `<digits><glyph>` into `<digits>g`, re-inserting a lost point
    /// for run lengths listed in the repair table.
    fn repair_lost_decimals(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len() + 4);
        let mut run_start = 0;

        for (i, &c) in chars.iter().enumerate() {
            if !c.is_ascii_digit() {
                if self.tables.lost_decimal_glyphs.contains(&c) && run_start < i {
                    let followed_by_letter = chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic());
                    if !followed_by_letter {
                        let run_len = i - run_start;
                        let has_point = run_start > 0 && matches!(chars[run_start - 1], '.' | ',');
                        let repair = self
                            .tables
                            .decimal_repairs
                            .iter()
                            .find(|r| r.digits == run_len && r.integer_digits < run_len);

                        // Drop the digits already pushed and rewrite the run.
                        let run: String = chars[run_start..i].iter().collect();
                        out.truncate(out.len() - run.len());
                        match repair {
                            Some(r) if !has_point => {
                                out.push_str(&run[..r.integer_digits]);
                                out.push('.');
                                out.push_str(&run[r.integer_digits..]);
                            }
                            _ => out.push_str(&run),
                        }
                        out.push('g');
                        run_start = i + 1;
                        continue;
                    }
                }
                run_start = i + 1;
            }
            out.push(c);
        }

        out
    }
}

/// Apply a substitution table until the text stops changing.
fn substitute(text: &str, table: &[(&str, &str)]) -> String {
    let mut result = text.to_string();

    for _ in 0..MAX_ROUNDS {
        let before = result.clone();
        for (wrong, right) in table {
            if result.contains(wrong) {
                result = result.replace(wrong, right);
            }
        }
        if result == before {
            break;
        }
    }

    result
}

/// Resolve thousands separators and decimal marks into a plain `f64` literal.
///
/// With both `,` and `.` present the last one is the decimal mark. A lone
/// separator kind followed only by 3-digit groups is a thousands separator
/// when it repeats or is a comma; otherwise it is the decimal mark.
fn normalize_separators(s: &str) -> String {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            let (decimal, thousands) = if c > d { (',', '.') } else { ('.', ',') };
            s.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => {
            let groups: Vec<&str> = s.split(',').collect();
            if groups[1..].iter().all(|g| g.len() == 3) {
                groups.concat()
            } else if groups.len() == 2 {
                s.replace(',', ".")
            } else {
                s.to_string()
            }
        }
        (None, Some(_)) => {
            let groups: Vec<&str> = s.split('.').collect();
            if groups.len() > 2 && groups[1..].iter().all(|g| g.len() == 3) {
                groups.concat()
            } else {
                s.to_string()
            }
        }
        (None, None) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nutrient_name_correction() {
        let c = OcrCorrector::new();
        assert_eq!(c.correct_text("たんぱく貿 5g"), "たんぱく質 5g");
        assert_eq!(c.correct_text("炭水イヒ物"), "炭水化物");
        assert_eq!(c.correct_text("食温相当量"), "食塩相当量");
        assert_eq!(c.correct_text("pr0tein 3g"), "protein 3g");
    }

    #[test]
    fn test_energy_name_variants() {
        let c = OcrCorrector::new();
        assert_eq!(c.correct_text("工ネルギー"), "エネルギー");
        assert_eq!(c.correct_text("エネルギ一"), "エネルギー");
        assert_eq!(c.correct_text("熟量 49kcal"), "熱量 49kcal");
    }

    #[test]
    fn test_unit_correction() {
        let c = OcrCorrector::new();
        assert_eq!(c.correct_text("250KCAL"), "250kcal");
        assert_eq!(c.correct_text("120ｍｇ"), "120mg");
        assert_eq!(c.correct_text("5ｇ"), "5g");
        assert_eq!(c.correct_text("80m9"), "80mg");
        assert_eq!(c.correct_text("150mcg"), "150μg");
        assert_eq!(c.correct_text("3.1』』g"), "3.1g");
    }

    #[test]
    fn test_unit_table_leaves_words_alone() {
        let c = OcrCorrector::new();
        assert_eq!(c.correct_text("sugar 3g"), "sugar 3g");
        assert_eq!(c.correct_text("タンパク質"), "タンパク質");
        assert_eq!(c.correct_text("1食あたり"), "1食あたり");
    }

    #[test]
    fn test_lost_decimal_repair() {
        let c = OcrCorrector::new();
        // Two digits: point after the first.
        assert_eq!(c.correct_text("18』"), "1.8g");
        assert_eq!(c.correct_text("脂質 53ブ "), "脂質 5.3g ");
        // Three digits: point after the second.
        assert_eq!(c.correct_text("118』"), "11.8g");
        // Other lengths only get the unit.
        assert_eq!(c.correct_text("5呂"), "5g");
        assert_eq!(c.correct_text("1234』"), "1234g");
        // Already has a point.
        assert_eq!(c.correct_text("1.85』"), "1.85g");
        // Glyph followed by a Latin letter is left as is.
        assert_eq!(c.correct_text("18』x"), "18』x");
        // No digits before the glyph.
        assert_eq!(c.correct_text("グラム"), "グラム");
    }

    #[test]
    fn test_correct_numeric_value() {
        let c = OcrCorrector::new();
        assert_eq!(c.correct_numeric_value("O.6"), "0.6");
        assert_eq!(c.correct_numeric_value("l5"), "15");
        assert_eq!(c.correct_numeric_value("B|Z"), "812");
        assert_eq!(c.correct_numeric_value("3。5"), "3.5");
    }

    #[test]
    fn test_extract_numeric_value() {
        let c = OcrCorrector::new();
        assert_eq!(c.extract_numeric_value("49kcal"), Some(49.0));
        assert_eq!(c.extract_numeric_value("3.3g"), Some(3.3));
        assert_eq!(c.extract_numeric_value("O.6g"), Some(0.6));
        assert_eq!(c.extract_numeric_value("O"), Some(0.0));
        assert_eq!(c.extract_numeric_value("l5.2"), Some(15.2));
        assert_eq!(c.extract_numeric_value("无数字"), None);
        assert_eq!(c.extract_numeric_value("無数字"), None);
        assert_eq!(c.extract_numeric_value("18』"), Some(1.8));
        assert_eq!(c.extract_numeric_value("118』"), Some(11.8));
        assert_eq!(c.extract_numeric_value("1,234"), Some(1234.0));
        assert_eq!(c.extract_numeric_value("0,5"), Some(0.5));
    }

    #[test]
    fn test_extract_numeric_value_range() {
        let c = OcrCorrector::new();
        assert_eq!(c.extract_numeric_value("10000"), Some(10_000.0));
        assert_eq!(c.extract_numeric_value("10001"), None);
        // First out of range, second accepted.
        assert_eq!(c.extract_numeric_value("99999 / 12"), Some(12.0));

        let tight = OcrCorrector::new().with_max_value(100.0);
        assert_eq!(tight.extract_numeric_value("250"), None);
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("1,234"), "1234");
        assert_eq!(normalize_separators("1,234,567"), "1234567");
        assert_eq!(normalize_separators("1.234,5"), "1234.5");
        assert_eq!(normalize_separators("1,234.5"), "1234.5");
        assert_eq!(normalize_separators("2,5"), "2.5");
        assert_eq!(normalize_separators("1.234.567"), "1234567");
        assert_eq!(normalize_separators("1.5"), "1.5");
    }

    #[test]
    fn test_injected_tables_replace_defaults() {
        let c = OcrCorrector::new().with_tables(CorrectionTables {
            nutrient_names: &[("enrgy", "energy")],
            units: &[("kcai", "kcal")],
            lost_decimal_glyphs: &['#'],
            decimal_repairs: &[DecimalRepair {
                digits: 2,
                integer_digits: 1,
            }],
            numeric_glyphs: &[('O', '0')],
        });

        assert_eq!(c.correct_text("enrgy 16kcai"), "energy 16kcal");
        assert_eq!(c.correct_text("18#"), "1.8g");
        assert_eq!(c.correct_text("たんぱく貿 5g"), "たんぱく貿 5g");
        assert_eq!(c.extract_numeric_value("O5"), Some(5.0));
        assert_eq!(c.extract_numeric_value("l5"), None);
    }

    #[test]
    fn test_correction_is_idempotent() {
        let c = OcrCorrector::new();
        let mut samples: Vec<String> = Vec::new();
        for (wrong, _) in NUTRIENT_NAMES.iter().chain(UNITS) {
            samples.push(wrong.to_string());
            samples.push(format!("12{}", wrong));
            samples.push(format!("{} 3.5g", wrong));
        }
        for glyph in LOST_DECIMAL_GLYPHS {
            for digits in ["5", "18", "118", "1234", "1.85"] {
                samples.push(format!("{}{}", digits, glyph));
                samples.push(format!("{}{} ", digits, glyph));
                samples.push(format!("{}{}{}", digits, glyph, glyph));
            }
        }
        samples.push("工ネルギー 16KCAL、たんぱく貿 1.6』".to_string());
        samples.push("3.1』』g".to_string());

        for sample in samples {
            let once = c.correct_text(&sample);
            let twice = c.correct_text(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }
}
