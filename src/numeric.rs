//! Parsing of the locale-formatted numbers found on listing pages and in
//! hand-edited records ("850'000", "1,250,000", "4,5", " 120 ").

use tracing::debug;

/// Characters that only ever group digits.
const GROUPING: [char; 2] = ['\'', '’'];

/// Swiss price suffixes such as `850'000.-`.
const PRICE_SUFFIXES: [&str; 2] = [".-", ".–"];

/// Parses an optional raw value, treating a missing value like an
/// unparseable one.
pub fn normalize(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_number)
}

/// Parses a grouped numeric string into a finite number.
///
/// Returns `None` for empty, non-numeric or non-finite input.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !GROUPING.contains(c))
        .collect();

    for suffix in PRICE_SUFFIXES {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.to_string();
            break;
        }
    }

    let cleaned = resolve_commas(&cleaned);
    if cleaned.is_empty() {
        return None;
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            debug!("Unparseable number: {:?}", raw);
            None
        }
    }
}

/// Commas group thousands unless a lone comma is followed by something other
/// than a three digit group in a string that has no decimal point.
fn resolve_commas(text: &str) -> String {
    let comma_count = text.matches(',').count();
    if comma_count == 1 && !text.contains('.') {
        if let Some((whole, fraction)) = text.split_once(',') {
            if fraction.len() != 3 {
                return format!("{}.{}", whole, fraction);
            }
        }
    }
    text.replace(',', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_apostrophe_and_decimal_comma() {
        assert_eq!(parse_number("1'234,5"), Some(1234.5));
    }

    #[test]
    fn test_grouping_variants() {
        assert_eq!(parse_number("850'000"), Some(850_000.0));
        assert_eq!(parse_number("1,000,000"), Some(1_000_000.0));
        assert_eq!(parse_number("1,250"), Some(1250.0));
        assert_eq!(parse_number("  120  "), Some(120.0));
        assert_eq!(parse_number("1 250 000"), Some(1_250_000.0));
        assert_eq!(parse_number("1’095’000"), Some(1_095_000.0));
        assert_eq!(parse_number("4.5"), Some(4.5));
        assert_eq!(parse_number("4,5"), Some(4.5));
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number("850'000.-"), Some(850_000.0));
    }

    #[test]
    fn test_unparseable_input() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("on request"), None);
        assert_eq!(parse_number("None"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("''"), None);
        assert_eq!(normalize(None), None);
    }

    #[test]
    fn test_normalize_present_value() {
        assert_eq!(normalize(Some("2'500")), Some(2500.0));
    }

    proptest! {
        #[test]
        fn grouped_digits_parse_to_their_value(value in 0u64..10_000_000_000u64, sep in prop::sample::select(vec!["'", " ", ","])) {
            let digits = value.to_string();
            let mut grouped = String::new();
            for (i, c) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push_str(sep);
                }
                grouped.push(c);
            }
            prop_assert_eq!(parse_number(&grouped), Some(value as f64));
        }

        #[test]
        fn arbitrary_text_never_panics(text in ".*") {
            if let Some(value) = parse_number(&text) {
                prop_assert!(value.is_finite());
            }
        }
    }
}
