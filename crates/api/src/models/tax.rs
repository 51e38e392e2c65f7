//! Tax class and rate models.

use chrono::{DateTime, Utc};
use emporium_core::catalog::TaxRateRule;
use emporium_core::catalog::lookup::validate_optional_name;
use emporium_core::{TaxClassId, TaxRateId, ValidationErrors};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TaxClass {
    pub id: TaxClassId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TaxRate {
    pub id: TaxRateId,
    pub tax_class_id: TaxClassId,
    pub country: String,
    pub state: Option<String>,
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
}

impl TaxRate {
    #[must_use]
    pub fn rule(&self) -> TaxRateRule {
        TaxRateRule {
            country: self.country.clone(),
            state: self.state.clone(),
            rate: self.rate,
        }
    }
}

/// Create and update payload for tax classes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxClassInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl TaxClassInput {
    #[must_use]
    pub fn validate(&self, creating: bool) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if creating && self.name.is_none() {
            errors.add("name", "this field is required");
        }
        validate_optional_name("name", self.name.as_deref(), &mut errors);
        errors
    }
}

/// Payload for creating a rate; on update absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxRateInput {
    pub country: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<String>>,
    pub rate: Option<Decimal>,
}

impl TaxRateInput {
    /// Merge onto `existing` (if any) and return the normalized, validated rule.
    ///
    /// # Errors
    ///
    /// Returns field errors for missing or invalid values.
    pub fn resolve(&self, existing: Option<&TaxRate>) -> Result<TaxRateRule, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let country = self
            .country
            .clone()
            .or_else(|| existing.map(|r| r.country.clone()));
        let rate = self.rate.or_else(|| existing.map(|r| r.rate));
        let state = match &self.state {
            Some(state) => state.clone(),
            None => existing.and_then(|r| r.state.clone()),
        };

        if country.is_none() {
            errors.add("country", "this field is required");
        }
        if rate.is_none() {
            errors.add("rate", "this field is required");
        }
        let (Some(country), Some(rate)) = (country, rate) else {
            return Err(errors);
        };

        let rule = TaxRateRule {
            country,
            state,
            rate,
        }
        .normalized();
        rule.validate()?;
        Ok(rule)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stored() -> TaxRate {
        TaxRate {
            id: TaxRateId::new(1),
            tax_class_id: TaxClassId::new(1),
            country: "US".to_string(),
            state: Some("CA".to_string()),
            rate: "7.25".parse().unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_requires_country_and_rate() {
        let errors = TaxRateInput::default().resolve(None).unwrap_err();
        assert!(errors.contains("country"));
        assert!(errors.contains("rate"));
    }

    #[test]
    fn test_create_normalizes_codes() {
        let input = TaxRateInput {
            country: Some(" de ".to_string()),
            state: Some(Some(String::new())),
            rate: Some("19".parse().unwrap()),
        };
        let rule = input.resolve(None).unwrap();
        assert_eq!(rule.country, "DE");
        assert_eq!(rule.state, None);
    }

    #[test]
    fn test_update_merges_and_clears_state() {
        let existing = stored();
        let keep = TaxRateInput {
            rate: Some("8".parse().unwrap()),
            ..TaxRateInput::default()
        };
        let rule = keep.resolve(Some(&existing)).unwrap();
        assert_eq!(rule.state.as_deref(), Some("CA"));
        assert_eq!(rule.rate, "8".parse().unwrap());

        let clear = TaxRateInput {
            state: Some(None),
            ..TaxRateInput::default()
        };
        assert_eq!(clear.resolve(Some(&existing)).unwrap().state, None);
    }

    #[test]
    fn test_rate_out_of_range() {
        let input = TaxRateInput {
            country: Some("FR".to_string()),
            state: None,
            rate: Some("120".parse().unwrap()),
        };
        assert!(input.resolve(None).unwrap_err().contains("rate"));
    }
}
