use crate::models::ParsedValue;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$").expect("valid date regex"));

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid key regex"));

/// Placeholder Fundamentus prints for a missing figure.
const ABSENT: &str = "-";

// ── Values ────────────────────────────────────────────────────────────────────

/// Decode one raw cell using Brazilian accounting notation.
///
/// "-" / "" → None | "12,34%" → 12.34 | "1.234.567" → 1234567
/// "02/05/2025" → "2025-05-02T00:00:00Z" | anything else unparseable → raw text
pub fn parse_value(raw: Option<&str>) -> Option<ParsedValue> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == ABSENT {
        return None;
    }

    if DATE_RE.is_match(trimmed) {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
            return Some(ParsedValue::Text(
                date.format("%Y-%m-%dT00:00:00Z").to_string(),
            ));
        }
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect();

    if let Some(pct) = compact.strip_suffix('%') {
        return Some(
            parse_decimal(pct)
                .map(ParsedValue::Float)
                .unwrap_or_else(|| ParsedValue::Text(raw.to_string())),
        );
    }

    if !compact.is_empty() && compact.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = compact.parse::<i64>() {
            return Some(ParsedValue::Int(i));
        }
    }

    Some(
        parse_decimal(&compact)
            .map(ParsedValue::Float)
            .unwrap_or_else(|| ParsedValue::Text(raw.to_string())),
    )
}

/// Shorthand for a cell that is always present as text.
pub fn parse_cell(raw: &str) -> Option<ParsedValue> {
    parse_value(Some(raw))
}

/// Comma is the decimal separator. Non-finite results ("NaN", "inf") are
/// rejected so they stay raw text.
fn parse_decimal(s: &str) -> Option<f64> {
    s.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

// ── Labels ────────────────────────────────────────────────────────────────────

/// Normalize a row label into a snake_case identifier.
///
/// "?Ativo Circ. Líquido " → "ativo_circ_liquido". Idempotent; empty input
/// yields an empty key, which callers skip.
pub fn format_key(raw: &str) -> String {
    let stripped = raw.trim().trim_start_matches('?').trim();
    if stripped.is_empty() {
        return String::new();
    }

    let folded: String = stripped
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    NON_ALNUM_RE
        .replace_all(&folded, "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_placeholders() {
        assert_eq!(parse_value(None), None);
        assert_eq!(parse_cell("-"), None);
        assert_eq!(parse_cell(" - "), None);
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("   "), None);
    }

    #[test]
    fn test_percentages() {
        assert_eq!(parse_cell("12,34%"), Some(ParsedValue::Float(12.34)));
        assert_eq!(parse_cell("-0,5%"), Some(ParsedValue::Float(-0.5)));
        assert_eq!(parse_cell("1.012,00%"), Some(ParsedValue::Float(1012.0)));
        assert_eq!(parse_cell("abc%"), Some(ParsedValue::Text("abc%".into())));
    }

    #[test]
    fn test_integers_with_thousands_separators() {
        assert_eq!(parse_cell("1.234.567"), Some(ParsedValue::Int(1_234_567)));
        assert_eq!(parse_cell("0"), Some(ParsedValue::Int(0)));
        assert_eq!(parse_cell("12 888 732"), Some(ParsedValue::Int(12_888_732)));
    }

    #[test]
    fn test_zero_is_not_absent() {
        assert_eq!(parse_cell("0,00"), Some(ParsedValue::Float(0.0)));
        assert_ne!(parse_cell("0"), None);
    }

    #[test]
    fn test_decimals_and_negatives() {
        assert_eq!(parse_cell("31,50"), Some(ParsedValue::Float(31.5)));
        assert_eq!(parse_cell("-2.500,75"), Some(ParsedValue::Float(-2500.75)));
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            parse_cell("02/05/2025"),
            Some(ParsedValue::Text("2025-05-02T00:00:00Z".into()))
        );
        // Shaped like a date but not one: falls through to the raw string.
        assert_eq!(
            parse_cell("31/02/2025"),
            Some(ParsedValue::Text("31/02/2025".into()))
        );
    }

    #[test]
    fn test_text_fallback_keeps_raw() {
        assert_eq!(
            parse_cell("Petrobras PN"),
            Some(ParsedValue::Text("Petrobras PN".into()))
        );
        assert_eq!(parse_cell("NaN"), Some(ParsedValue::Text("NaN".into())));
        assert_eq!(parse_cell("inf"), Some(ParsedValue::Text("inf".into())));
    }

    #[test]
    fn test_huge_digit_run_degrades_to_float() {
        let v = parse_cell("99999999999999999999").unwrap();
        assert!(matches!(v, ParsedValue::Float(_)));
    }

    #[test]
    fn test_format_key() {
        assert_eq!(format_key("?Ativo Circ. Líquido "), "ativo_circ_liquido");
        assert_eq!(format_key("Cotação"), "cotacao");
        assert_eq!(format_key("Dív. Bruta/ Patrim."), "div_bruta_patrim");
        assert_eq!(format_key("Vol $ méd (2m)"), "vol_med_2m");
        assert_eq!(format_key("Últ balanço processado"), "ult_balanco_processado");
        assert_eq!(format_key("30 dias"), "30_dias");
        assert_eq!(format_key("2024"), "2024");
        assert_eq!(format_key(""), "");
        assert_eq!(format_key(" ? "), "");
    }

    #[test]
    fn test_format_key_idempotent() {
        for raw in [
            "?Ativo Circ. Líquido ",
            "P/VP",
            "  ?Div. Yield",
            "Nro. Ações",
            "___",
            "Mês",
            "FFO/Cota",
            "Área (m²)",
        ] {
            let once = format_key(raw);
            assert_eq!(format_key(&once), once, "not idempotent for {raw:?}");
        }
    }
}
