//! Locale-aware currency formatting.
//!
//! Formatting rules cover the languages the catalog ships translations for.
//! Unknown languages use the English layout.

use rust_decimal::Decimal;

use crate::locale::LanguageCode;
use crate::types::{CurrencyCode, Price};

/// Separator and symbol placement rules for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal: char,
    pub group: Option<char>,
    pub symbol_first: bool,
    pub symbol_space: bool,
}

const NBSP: char = '\u{a0}';

impl NumberFormat {
    /// Formatting rules for `language`, keyed on the primary subtag.
    #[must_use]
    pub fn for_language(language: &LanguageCode) -> Self {
        if language.as_str() == "de-ch" {
            return Self {
                decimal: '.',
                group: Some('\''),
                symbol_first: true,
                symbol_space: true,
            };
        }
        match language.primary() {
            "de" | "es" | "it" | "pt" | "da" | "id" | "tr" => Self {
                decimal: ',',
                group: Some('.'),
                symbol_first: false,
                symbol_space: true,
            },
            "fr" | "sv" | "nb" | "no" | "fi" | "cs" | "pl" | "hu" | "ru" | "uk" => Self {
                decimal: ',',
                group: Some(NBSP),
                symbol_first: false,
                symbol_space: true,
            },
            "nl" => Self {
                decimal: ',',
                group: Some('.'),
                symbol_first: true,
                symbol_space: true,
            },
            _ => Self {
                decimal: '.',
                group: Some(','),
                symbol_first: true,
                symbol_space: false,
            },
        }
    }
}

/// Render `price` for display in `language`, rounded to the currency's minor unit.
///
/// ```
/// use emporium_core::{CurrencyCode, Price, locale::LanguageCode, money::format_price};
///
/// let en = LanguageCode::parse("en").unwrap();
/// let price = Price::new("1234.5".parse().unwrap(), CurrencyCode::USD);
/// assert_eq!(format_price(&price, &en), "$1,234.50");
/// ```
#[must_use]
pub fn format_price(price: &Price, language: &LanguageCode) -> String {
    format_amount(price.amount, price.currency_code, language)
}

/// Render a bare amount in `currency` for display in `language`.
#[must_use]
pub fn format_amount(amount: Decimal, currency: CurrencyCode, language: &LanguageCode) -> String {
    let rules = NumberFormat::for_language(language);
    let rounded = Price::new(amount, currency).rounded().amount;
    let exponent = currency.exponent() as usize;

    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.*}", exponent, rounded.abs());
    let (int_part, frac_part) = digits
        .split_once('.')
        .map_or((digits.as_str(), ""), |(i, f)| (i, f));

    let mut number = group_digits(int_part, rules.group);
    if !frac_part.is_empty() {
        number.push(rules.decimal);
        number.push_str(frac_part);
    }

    let symbol = currency.symbol();
    let spacer = if rules.symbol_space { NBSP.to_string() } else { String::new() };
    let body = if rules.symbol_first {
        format!("{symbol}{spacer}{number}")
    } else {
        format!("{number}{spacer}{symbol}")
    };

    if negative { format!("-{body}") } else { body }
}

fn group_digits(int_part: &str, group: Option<char>) -> String {
    let Some(sep) = group else {
        return int_part.to_string();
    };
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(s: &str) -> LanguageCode {
        LanguageCode::parse(s).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_english_usd() {
        assert_eq!(format_amount(dec("1234567.891"), CurrencyCode::USD, &lang("en")), "$1,234,567.89");
        assert_eq!(format_amount(dec("5"), CurrencyCode::USD, &lang("en")), "$5.00");
    }

    #[test]
    fn test_german_euro() {
        assert_eq!(
            format_amount(dec("1234.5"), CurrencyCode::EUR, &lang("de")),
            "1.234,50\u{a0}€"
        );
    }

    #[test]
    fn test_french_groups_with_nbsp() {
        assert_eq!(
            format_amount(dec("1234.5"), CurrencyCode::EUR, &lang("fr")),
            "1\u{a0}234,50\u{a0}€"
        );
    }

    #[test]
    fn test_zero_exponent_currency() {
        assert_eq!(format_amount(dec("1234.5"), CurrencyCode::JPY, &lang("en")), "¥1,235");
    }

    #[test]
    fn test_three_digit_exponent() {
        assert_eq!(format_amount(dec("1.2"), CurrencyCode::KWD, &lang("en")), "KD1.200");
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(format_amount(dec("-12.5"), CurrencyCode::GBP, &lang("en")), "-£12.50");
    }

    #[test]
    fn test_unknown_language_uses_english_layout() {
        assert_eq!(format_amount(dec("999.99"), CurrencyCode::USD, &lang("xx")), "$999.99");
    }

    #[test]
    fn test_swiss_german_overrides_german() {
        assert_eq!(
            format_amount(dec("1234.5"), CurrencyCode::CHF, &lang("de-CH")),
            "CHF\u{a0}1'234.50"
        );
    }

    #[test]
    fn test_small_numbers_are_not_grouped() {
        assert_eq!(group_digits("999", Some(',')), "999");
        assert_eq!(group_digits("1000", Some(',')), "1,000");
    }
}
