// 🔢 Numeric Conversion - text fields <-> numbers
//
// Bound text fields round-trip through these converters on every keystroke,
// so a conversion must never fail: blank or malformed text becomes zero.
// `Conversion::failed` is the only trace a bad parse leaves.

use log::debug;

// ============================================================================
// NUMBER LOCALE
// ============================================================================

/// Separators used to render and read numbers for one culture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub tag: &'static str,
    pub decimal_separator: char,
    /// Thousands separator accepted on input (never emitted)
    pub group_separator: Option<char>,
}

impl NumberLocale {
    pub const fn invariant() -> Self {
        NumberLocale {
            tag: "invariant",
            decimal_separator: '.',
            group_separator: Some(','),
        }
    }

    pub const fn en_us() -> Self {
        NumberLocale {
            tag: "en-US",
            decimal_separator: '.',
            group_separator: Some(','),
        }
    }

    pub const fn ru_ru() -> Self {
        NumberLocale {
            tag: "ru-RU",
            decimal_separator: ',',
            group_separator: Some('\u{a0}'),
        }
    }

    pub const fn de_de() -> Self {
        NumberLocale {
            tag: "de-DE",
            decimal_separator: ',',
            group_separator: Some('.'),
        }
    }

    pub fn all() -> [NumberLocale; 4] {
        [
            Self::invariant(),
            Self::en_us(),
            Self::ru_ru(),
            Self::de_de(),
        ]
    }

    /// Look up a preset by tag ("ru-RU", "ru_ru", "ru", "invariant").
    pub fn from_tag(tag: &str) -> Option<Self> {
        let wanted = tag.trim().replace('_', "-").to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        Self::all().into_iter().find(|locale| {
            let known = locale.tag.to_lowercase();
            known == wanted || known.split('-').next() == Some(wanted.as_str())
        })
    }

    /// Strip grouping and whitespace, map the decimal separator to '.',
    /// and turn accounting parentheses into a leading minus.
    ///
    /// `None` when the text uses a '.' or ',' that is neither of this
    /// locale's separators.
    fn normalize(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        let (negative, body) = match trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => (true, inner),
            None => (false, trimmed),
        };

        let mut out = String::with_capacity(body.len() + 1);
        if negative {
            out.push('-');
        }
        for c in body.chars() {
            if c.is_whitespace() || Some(c) == self.group_separator {
                continue;
            }
            if c == self.decimal_separator {
                out.push('.');
            } else if c == '.' || c == ',' {
                return None;
            } else {
                out.push(c);
            }
        }
        Some(out)
    }
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self::invariant()
    }
}

// ============================================================================
// CONVERTERS
// ============================================================================

/// Result of reading a text field. `failed` is set only for non-blank text
/// that could not be read; `value` is zero in that case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion<T> {
    pub value: T,
    pub failed: bool,
}

impl<T> Conversion<T> {
    fn ok(value: T) -> Self {
        Conversion { value, failed: false }
    }
}

impl<T: Default> Conversion<T> {
    fn fallback() -> Self {
        Conversion {
            value: T::default(),
            failed: true,
        }
    }
}

/// Two-way conversion between a numeric field and its display text.
pub trait NumericConverter {
    type Value: Copy + Default;

    /// Render a value; absent renders as an empty string.
    fn to_display(&self, value: Option<Self::Value>) -> String;

    /// Read text, reporting whether it had to fall back to zero.
    fn parse(&self, text: &str) -> Conversion<Self::Value>;

    /// Read text; anything unreadable is zero.
    fn to_value(&self, text: &str) -> Self::Value {
        self.parse(text).value
    }
}

/// Whole numbers (mileage, capacity, passengers, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntConverter {
    pub locale: NumberLocale,
}

impl IntConverter {
    pub fn new(locale: NumberLocale) -> Self {
        IntConverter { locale }
    }
}

impl NumericConverter for IntConverter {
    type Value = i64;

    fn to_display(&self, value: Option<i64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    fn parse(&self, text: &str) -> Conversion<i64> {
        if text.trim().is_empty() {
            return Conversion::ok(0);
        }

        let Some(normalized) = self.locale.normalize(text) else {
            debug!("integer field {:?} read as 0 (foreign separator)", text);
            return Conversion::fallback();
        };

        match normalized.parse::<i64>() {
            Ok(value) => Conversion::ok(value),
            Err(e) => {
                debug!("integer field {:?} read as 0 ({})", text, e);
                Conversion::fallback()
            }
        }
    }
}

/// Money and fractional quantities (salary, bonus percent, length, revenue).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecimalConverter {
    pub locale: NumberLocale,
}

impl DecimalConverter {
    pub fn new(locale: NumberLocale) -> Self {
        DecimalConverter { locale }
    }
}

impl NumericConverter for DecimalConverter {
    type Value = f64;

    fn to_display(&self, value: Option<f64>) -> String {
        match value {
            // Records never hold non-finite values; render them as blank.
            Some(v) if v.is_finite() => {
                // Avoid "-0" for negative zero
                let v = if v == 0.0 { 0.0 } else { v };
                let text = v.to_string();
                if self.locale.decimal_separator == '.' {
                    text
                } else {
                    text.replace('.', &self.locale.decimal_separator.to_string())
                }
            }
            _ => String::new(),
        }
    }

    fn parse(&self, text: &str) -> Conversion<f64> {
        if text.trim().is_empty() {
            return Conversion::ok(0.0);
        }

        let Some(normalized) = self.locale.normalize(text) else {
            debug!("decimal field {:?} read as 0 (foreign separator)", text);
            return Conversion::fallback();
        };

        match normalized.parse::<f64>() {
            Ok(value) if value.is_finite() => Conversion::ok(value),
            Ok(value) => {
                debug!("decimal field {:?} read as 0 (non-finite {})", text, value);
                Conversion::fallback()
            }
            Err(e) => {
                debug!("decimal field {:?} read as 0 ({})", text, e);
                Conversion::fallback()
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn test_blank_text_is_zero(#[case] text: &str) {
        let ints = IntConverter::default();
        let decimals = DecimalConverter::default();

        assert_eq!(ints.to_value(text), 0);
        assert_eq!(decimals.to_value(text), 0.0);

        // Blank is not a failed parse
        assert!(!ints.parse(text).failed);
        assert!(!decimals.parse(text).failed);
    }

    #[rstest]
    #[case("not a number")]
    #[case("12abc")]
    #[case("1.2.3")]
    #[case("()")]
    fn test_garbage_falls_back_to_zero(#[case] text: &str) {
        let ints = IntConverter::default();
        let decimals = DecimalConverter::default();

        assert_eq!(ints.to_value(text), 0);
        assert_eq!(decimals.to_value(text), 0.0);
        assert!(ints.parse(text).failed);
        assert!(decimals.parse(text).failed);
    }

    #[test]
    fn test_absent_renders_empty() {
        assert_eq!(IntConverter::default().to_display(None), "");
        assert_eq!(DecimalConverter::default().to_display(None), "");
    }

    #[test]
    fn test_int_display_is_plain() {
        let ints = IntConverter::new(NumberLocale::ru_ru());
        assert_eq!(ints.to_display(Some(125000)), "125000");
        assert_eq!(ints.to_display(Some(-7)), "-7");
    }

    #[rstest]
    #[case(NumberLocale::invariant(), "1,250", 1250)]
    #[case(NumberLocale::en_us(), " +42 ", 42)]
    #[case(NumberLocale::ru_ru(), "1\u{a0}250", 1250)]
    #[case(NumberLocale::ru_ru(), "1 250", 1250)]
    #[case(NumberLocale::de_de(), "1.250", 1250)]
    #[case(NumberLocale::invariant(), "(15)", -15)]
    fn test_int_parse_is_lenient(
        #[case] locale: NumberLocale,
        #[case] text: &str,
        #[case] expected: i64,
    ) {
        let parsed = IntConverter::new(locale).parse(text);
        assert_eq!(parsed.value, expected);
        assert!(!parsed.failed);
    }

    #[rstest]
    #[case(NumberLocale::invariant(), "1,234.5", 1234.5)]
    #[case(NumberLocale::en_us(), "-0.25", -0.25)]
    #[case(NumberLocale::ru_ru(), "35\u{a0}000,75", 35000.75)]
    #[case(NumberLocale::de_de(), "1.234,5", 1234.5)]
    #[case(NumberLocale::invariant(), "(12.5)", -12.5)]
    #[case(NumberLocale::invariant(), "1e3", 1000.0)]
    fn test_decimal_parse_is_lenient(
        #[case] locale: NumberLocale,
        #[case] text: &str,
        #[case] expected: f64,
    ) {
        let parsed = DecimalConverter::new(locale).parse(text);
        assert_eq!(parsed.value, expected);
        assert!(!parsed.failed);
    }

    #[test]
    fn test_decimal_display_uses_locale_separator() {
        assert_eq!(
            DecimalConverter::new(NumberLocale::en_us()).to_display(Some(1234.5)),
            "1234.5"
        );
        assert_eq!(
            DecimalConverter::new(NumberLocale::ru_ru()).to_display(Some(1234.5)),
            "1234,5"
        );
        assert_eq!(
            DecimalConverter::new(NumberLocale::de_de()).to_display(Some(-0.0)),
            "0"
        );
    }

    #[test]
    fn test_non_finite_decimals_fall_back() {
        let decimals = DecimalConverter::default();
        assert!(decimals.parse("inf").failed);
        assert!(decimals.parse("NaN").failed);
        assert_eq!(decimals.to_display(Some(f64::NAN)), "");
    }

    #[test]
    fn test_wrong_separator_for_locale_fails_soft() {
        // ru-RU does not read '.' as a decimal point
        let parsed = DecimalConverter::new(NumberLocale::ru_ru()).parse("12.5");
        assert!(parsed.failed);
        assert_eq!(parsed.value, 0.0);

        let parsed = IntConverter::new(NumberLocale::ru_ru()).parse("1.250");
        assert!(parsed.failed);
        assert_eq!(parsed.value, 0);

        // de-DE groups with '.', so the same text is a whole number there
        assert_eq!(DecimalConverter::new(NumberLocale::de_de()).to_value("12.5"), 125.0);
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(NumberLocale::from_tag("ru-RU"), Some(NumberLocale::ru_ru()));
        assert_eq!(NumberLocale::from_tag("ru_ru"), Some(NumberLocale::ru_ru()));
        assert_eq!(NumberLocale::from_tag("de"), Some(NumberLocale::de_de()));
        assert_eq!(
            NumberLocale::from_tag("Invariant"),
            Some(NumberLocale::invariant())
        );
        assert_eq!(NumberLocale::from_tag("xx-YY"), None);
        assert_eq!(NumberLocale::from_tag(""), None);
    }
}
