use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Currency token recognized in scraped price text.
///
/// The tracked storefronts all price in lira; the closed set below exists
/// so a stray USD/EUR/GBP listing is carried through labeled instead of
/// silently mixed in. An unrecognized or missing token defaults to lira.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Lira,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    /// Display symbol, also the persisted form.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Lira => "₺",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }

    /// Map a matched token ("TL", "TRY", "₺", "$", "USD", ...) to a currency.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_uppercase().as_str() {
            "₺" | "TL" | "TRY" => Some(Currency::Lira),
            "$" | "USD" => Some(Currency::Usd),
            "€" | "EUR" => Some(Currency::Eur),
            "£" | "GBP" => Some(Currency::Gbp),
            _ => None,
        }
    }

    /// Recover a currency from its persisted symbol, defaulting to lira.
    pub fn from_symbol(s: &str) -> Self {
        Self::from_token(s).unwrap_or(Currency::Lira)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// De-ambiguated price: non-negative decimal value plus currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPrice {
    pub value: Decimal,
    pub currency: Currency,
}

static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(₺|TL|TRY|USD|\$|EUR|€|GBP|£)").unwrap());

/// Parse raw price text (plus an optional pre-parsed hint from the
/// upstream extractor) into a [`CanonicalPrice`].
///
/// The separator disambiguation is what makes prices numerically
/// comparable across storefronts that use opposite grouping/decimal
/// conventions: "1.234,56" and "1,234.56" both come out as 1234.56.
pub fn parse_price(raw: &str, hint: Option<f64>) -> AppResult<CanonicalPrice> {
    let currency = CURRENCY_RE
        .find(raw)
        .and_then(|m| Currency::from_token(m.as_str()))
        .unwrap_or(Currency::Lira);

    // A finite hint from the extractor wins over re-parsing the text.
    if let Some(h) = hint.filter(|h| h.is_finite()) {
        let value = Decimal::from_f64_retain(h)
            .ok_or_else(|| AppError::UnparsablePrice(raw.to_string()))?;
        if value.is_sign_negative() {
            return Err(AppError::UnparsablePrice(raw.to_string()));
        }
        return Ok(CanonicalPrice { value, currency });
    }

    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if digits.is_empty() {
        return Err(AppError::UnparsablePrice(raw.to_string()));
    }

    let canonical = disambiguate_separators(&digits);

    let value = Decimal::from_str(&canonical)
        .map_err(|_| AppError::UnparsablePrice(raw.to_string()))?;
    if value.is_sign_negative() {
        return Err(AppError::UnparsablePrice(raw.to_string()));
    }

    Ok(CanonicalPrice { value, currency })
}

/// Resolve `,` vs `.` into a single canonical decimal point.
///
/// Rules, in order:
/// - both present: the rightmost of the two is the decimal separator, the
///   other is grouping and removed everywhere;
/// - only commas: the last comma is the decimal separator, earlier ones
///   are grouping;
/// - only dots: the last dot is the decimal separator, unless the final
///   segment is exactly three digits and there are at least two segments,
///   which signals pure grouping ("1.234.567" -> "1234567").
fn disambiguate_separators(s: &str) -> String {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            let (decimal, grouping) = if c > d { (',', '.') } else { ('.', ',') };
            let stripped: String = s.chars().filter(|&ch| ch != grouping).collect();
            keep_last_as_decimal(&stripped, decimal)
        }
        (Some(_), None) => keep_last_as_decimal(s, ','),
        (None, Some(d)) => {
            let tail = &s[d + 1..];
            let segments = s.split('.').count();
            if segments >= 2 && tail.len() == 3 && tail.chars().all(|c| c.is_ascii_digit()) {
                s.chars().filter(|&c| c != '.').collect()
            } else {
                keep_last_as_decimal(s, '.')
            }
        }
        (None, None) => s.to_string(),
    }
}

/// Drop every occurrence of `sep` except the last, which becomes `.`.
fn keep_last_as_decimal(s: &str, sep: char) -> String {
    let last = match s.rfind(sep) {
        Some(i) => i,
        None => return s.to_string(),
    };
    s.char_indices()
        .filter_map(|(i, c)| {
            if c == sep {
                (i == last).then_some('.')
            } else {
                Some(c)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(raw: &str) -> Decimal {
        parse_price(raw, None).unwrap().value
    }

    #[test]
    fn test_opposite_conventions_agree() {
        assert_eq!(value("1.234,56"), value("1,234.56"));
        assert_eq!(value("1.234,56"), Decimal::new(123456, 2));
    }

    #[test]
    fn test_comma_decimal() {
        assert_eq!(value("189,99"), Decimal::new(18999, 2));
        assert_eq!(value("1,234,56"), Decimal::new(123456, 2));
    }

    #[test]
    fn test_dot_grouping_three_digit_tail() {
        // Three dot-grouped segments: every dot is grouping.
        assert_eq!(value("1.234.567"), Decimal::new(1234567, 0));
        assert_eq!(value("1.234"), Decimal::new(1234, 0));
    }

    #[test]
    fn test_dot_decimal() {
        assert_eq!(value("10.5"), Decimal::new(105, 1));
        assert_eq!(value("1.2345"), Decimal::new(12345, 4));
        assert_eq!(value("1.234.56"), Decimal::new(123456, 2));
    }

    #[test]
    fn test_currency_detection() {
        assert_eq!(parse_price("189,99 TL", None).unwrap().currency, Currency::Lira);
        assert_eq!(parse_price("₺189,99", None).unwrap().currency, Currency::Lira);
        assert_eq!(parse_price("try 189,99", None).unwrap().currency, Currency::Lira);
        assert_eq!(parse_price("$4.99", None).unwrap().currency, Currency::Usd);
        assert_eq!(parse_price("4,99 €", None).unwrap().currency, Currency::Eur);
        assert_eq!(parse_price("£4.99", None).unwrap().currency, Currency::Gbp);
        // No recognized token defaults to lira, not an error.
        assert_eq!(parse_price("189,99", None).unwrap().currency, Currency::Lira);
    }

    #[test]
    fn test_hint_preferred_over_text() {
        let p = parse_price("189,99 TL", Some(200.5)).unwrap();
        assert_eq!(p.value, Decimal::from_f64_retain(200.5).unwrap());
        assert_eq!(p.currency, Currency::Lira);
    }

    #[test]
    fn test_non_finite_hint_falls_back_to_text() {
        let p = parse_price("189,99", Some(f64::NAN)).unwrap();
        assert_eq!(p.value, Decimal::new(18999, 2));
    }

    #[test]
    fn test_unparsable_inputs_rejected() {
        assert!(parse_price("", None).unwrap_err().is_unparsable_price());
        assert!(parse_price("fiyat yok", None).unwrap_err().is_unparsable_price());
        assert!(parse_price("-10,5", None).unwrap_err().is_unparsable_price());
        assert!(parse_price("100", Some(-1.0)).unwrap_err().is_unparsable_price());
    }

    #[test]
    fn test_noise_stripped() {
        assert_eq!(value("  ₺ 1.299,90 (KDV dahil)"), Decimal::new(129_990, 2));
    }
}
