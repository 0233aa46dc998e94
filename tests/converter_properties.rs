use depot_desk::{DecimalConverter, IntConverter, NumberLocale, NumericConverter};
use proptest::prelude::*;

fn any_locale() -> impl Strategy<Value = NumberLocale> {
    prop::sample::select(NumberLocale::all().to_vec())
}

fn finite_f64() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite", |v| v.is_finite())
}

proptest! {
    #[test]
    fn prop_int_display_reads_back(locale in any_locale(), value in any::<i64>()) {
        let ints = IntConverter::new(locale);
        let text = ints.to_display(Some(value));
        let conversion = ints.parse(&text);
        prop_assert!(!conversion.failed);
        prop_assert_eq!(conversion.value, value);
    }

    #[test]
    fn prop_decimal_display_reads_back(locale in any_locale(), value in finite_f64()) {
        let decimals = DecimalConverter::new(locale);
        let text = decimals.to_display(Some(value));
        let conversion = decimals.parse(&text);
        prop_assert!(!conversion.failed);
        prop_assert_eq!(conversion.value, value);
    }

    #[test]
    fn prop_any_text_is_stable_after_one_pass(locale in any_locale(), text in ".{0,24}") {
        let ints = IntConverter::new(locale);
        let once = ints.to_value(&text);
        prop_assert_eq!(ints.to_value(&ints.to_display(Some(once))), once);

        let decimals = DecimalConverter::new(locale);
        let once = decimals.to_value(&text);
        prop_assert!(once.is_finite());
        prop_assert_eq!(decimals.to_value(&decimals.to_display(Some(once))), once);
    }

    #[test]
    fn prop_words_fall_back_to_zero(locale in any_locale(), text in "[a-zA-Z]{1,12}") {
        let ints = IntConverter::new(locale).parse(&text);
        prop_assert!(ints.failed);
        prop_assert_eq!(ints.value, 0);

        let decimals = DecimalConverter::new(locale).parse(&text);
        prop_assert!(decimals.failed);
        prop_assert_eq!(decimals.value, 0.0);
    }

    #[test]
    fn prop_blank_is_zero_without_failure(locale in any_locale(), text in "[ \t]{0,6}") {
        let ints = IntConverter::new(locale).parse(&text);
        prop_assert!(!ints.failed);
        prop_assert_eq!(ints.value, 0);

        let decimals = DecimalConverter::new(locale).parse(&text);
        prop_assert!(!decimals.failed);
        prop_assert_eq!(decimals.value, 0.0);
    }
}
