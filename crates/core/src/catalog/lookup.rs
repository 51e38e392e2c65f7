//! Field rules for the flat lookup entities: collections, tags, product
//! types, and suppliers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationErrors;

pub const MAX_LOOKUP_NAME_LENGTH: usize = 128;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()\-.]{5,32}$").expect("Invalid regex"));

/// Check a required display name: present after trimming and not too long.
pub fn validate_name(field: &str, value: &str, errors: &mut ValidationErrors) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "this field may not be blank");
    } else if trimmed.chars().count() > MAX_LOOKUP_NAME_LENGTH {
        errors.add(
            field,
            format!("must be at most {MAX_LOOKUP_NAME_LENGTH} characters"),
        );
    }
}

/// Check an optional name that is only validated when present.
pub fn validate_optional_name(field: &str, value: Option<&str>, errors: &mut ValidationErrors) {
    if let Some(value) = value {
        validate_name(field, value, errors);
    }
}

/// Contact details carried by a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierContact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SupplierContact {
    /// Trim every field and drop blanks.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            email: clean(self.email).map(|e| e.to_lowercase()),
            phone: clean(self.phone),
            website: clean(self.website),
            address: clean(self.address),
        }
    }

    /// Validate a normalized contact record.
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(email) = &self.email
            && !EMAIL_RE.is_match(email)
        {
            errors.add("email", "enter a valid email address");
        }
        if let Some(phone) = &self.phone
            && !PHONE_RE.is_match(phone)
        {
            errors.add("phone", "enter a valid phone number");
        }
        if let Some(website) = &self.website {
            let ok = url::Url::parse(website)
                .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some());
            if !ok {
                errors.add("website", "enter a valid http or https URL");
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        let mut errors = ValidationErrors::new();
        validate_name("name", "   ", &mut errors);
        assert!(errors.contains("name"));

        let mut errors = ValidationErrors::new();
        validate_name("name", &"x".repeat(MAX_LOOKUP_NAME_LENGTH + 1), &mut errors);
        assert!(errors.contains("name"));

        let mut errors = ValidationErrors::new();
        validate_optional_name("name", None, &mut errors);
        validate_name("title", "Summer", &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_supplier_contact_normalizes() {
        let contact = SupplierContact {
            email: Some("  Sales@Example.COM ".into()),
            phone: Some("".into()),
            website: None,
            address: Some(" 1 Main St ".into()),
        }
        .normalized();
        assert_eq!(contact.email.as_deref(), Some("sales@example.com"));
        assert_eq!(contact.phone, None);
        assert_eq!(contact.address.as_deref(), Some("1 Main St"));
        assert!(contact.validate().is_empty());
    }

    #[test]
    fn test_supplier_contact_rejects_garbage() {
        let contact = SupplierContact {
            email: Some("not-an-email".into()),
            phone: Some("call me".into()),
            website: Some("javascript:alert(1)".into()),
            address: None,
        };
        let errors = contact.validate();
        assert!(errors.contains("email"));
        assert!(errors.contains("phone"));
        assert!(errors.contains("website"));
    }
}
