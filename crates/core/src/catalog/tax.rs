//! Jurisdiction-scoped tax rates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Price;
use crate::validation::ValidationErrors;

/// A percentage rate scoped to a country and optionally a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRateRule {
    /// ISO 3166-1 alpha-2 country code, uppercase.
    pub country: String,
    /// State or province code; `None` applies to the whole country.
    pub state: Option<String>,
    /// Percentage in `[0, 100]`.
    pub rate: Decimal,
}

impl TaxRateRule {
    /// Normalize codes to uppercase and blank states to `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.country = self.country.trim().to_ascii_uppercase();
        self.state = self
            .state
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty());
        self
    }

    /// Validate a normalized rule.
    ///
    /// # Errors
    ///
    /// Returns field errors for a malformed country or state code, or a rate
    /// outside `[0, 100]`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            errors.add("country", "must be a two-letter ISO 3166-1 code");
        }
        if let Some(state) = &self.state
            && (state.len() > 10 || !state.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        {
            errors.add("state", "must be at most 10 letters, digits, or hyphens");
        }
        if self.rate < Decimal::ZERO || self.rate > Decimal::ONE_HUNDRED {
            errors.add("rate", "must be between 0 and 100");
        }
        if self.rate.normalize().scale() > 4 {
            errors.add("rate", "must have at most 4 decimal places");
        }
        errors.into_result()
    }
}

/// Pick the most specific rule for a location.
///
/// A rule matching both country and state wins over a country-wide rule.
#[must_use]
pub fn select_rate<'a, R>(
    rules: &'a [R],
    country: &str,
    state: Option<&str>,
    rule: impl Fn(&R) -> &TaxRateRule,
) -> Option<&'a R> {
    let country = country.trim().to_ascii_uppercase();
    let state = state
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty());

    let mut country_wide = None;
    for candidate in rules {
        let r = rule(candidate);
        if r.country != country {
            continue;
        }
        match (&state, &r.state) {
            (Some(wanted), Some(have)) if wanted == have => return Some(candidate),
            (_, None) if country_wide.is_none() => country_wide = Some(candidate),
            _ => {}
        }
    }
    country_wide
}

/// Tax owed on `price` at `rate` percent, rounded to the currency's minor unit.
///
/// Returns `None` when the amount is out of decimal range.
#[must_use]
pub fn tax_amount(price: &Price, rate: Decimal) -> Option<Price> {
    let owed = price
        .amount
        .checked_mul(rate)?
        .checked_div(Decimal::ONE_HUNDRED)?;
    Some(Price::new(owed, price.currency_code).rounded())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrencyCode;

    fn rule(country: &str, state: Option<&str>, rate: &str) -> TaxRateRule {
        TaxRateRule {
            country: country.to_string(),
            state: state.map(String::from),
            rate: rate.parse().unwrap(),
        }
    }

    #[test]
    fn test_state_rule_beats_country_rule() {
        let rules = vec![rule("US", None, "5"), rule("US", Some("CA"), "7.25")];
        let picked = select_rate(&rules, "us", Some("ca"), |r| r).unwrap();
        assert_eq!(picked.rate, "7.25".parse().unwrap());
    }

    #[test]
    fn test_falls_back_to_country_rule() {
        let rules = vec![rule("US", None, "5"), rule("US", Some("CA"), "7.25")];
        let picked = select_rate(&rules, "US", Some("NY"), |r| r).unwrap();
        assert_eq!(picked.rate, "5".parse().unwrap());
    }

    #[test]
    fn test_no_rule_for_country() {
        let rules = vec![rule("DE", None, "19")];
        assert!(select_rate(&rules, "FR", None, |r| r).is_none());
    }

    #[test]
    fn test_normalize_and_validate() {
        let r = rule(" de ", Some(" "), "19").normalized();
        assert_eq!(r.country, "DE");
        assert_eq!(r.state, None);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let errors = rule("DEU", None, "101").validate().unwrap_err();
        assert!(errors.contains("country"));
        assert!(errors.contains("rate"));
    }

    #[test]
    fn test_tax_amount_rounds() {
        let price = Price::new("19.99".parse().unwrap(), CurrencyCode::EUR);
        let tax = tax_amount(&price, "19".parse().unwrap()).unwrap();
        assert_eq!(tax.amount, "3.80".parse().unwrap());
    }

    #[test]
    fn test_tax_amount_out_of_range() {
        let price = Price::new("10000000000000000000000000000".parse().unwrap(), CurrencyCode::USD);
        assert!(tax_amount(&price, "20".parse().unwrap()).is_none());
        assert!(tax_amount(&price, Decimal::ZERO).is_some());
    }
}
