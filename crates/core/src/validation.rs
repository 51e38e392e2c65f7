//! Field-level validation errors.
//!
//! Validation collects every problem in a payload instead of stopping at the
//! first one, so API clients can fix all fields in one round trip. Errors are
//! keyed by field path (`name`, `variants[2].sku`, `non_field_errors`).

use std::collections::BTreeMap;

use serde::Serialize;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Accumulated validation errors, keyed by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error set holding a single message.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Merge another set as-is.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Merge another set under a field prefix, e.g. `variants[1]`.
    pub fn merge_prefixed(&mut self, prefix: &str, other: Self) {
        for (field, messages) in other.0 {
            let key = if field == NON_FIELD_ERRORS {
                prefix.to_string()
            } else {
                format!("{prefix}.{field}")
            };
            self.0.entry(key).or_default().extend(messages);
        }
    }

    /// Whether no errors have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded against `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` has at least one message.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterate over `(field, messages)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the error set itself when it holds at least one message.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_multiple_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "required");
        errors.add("name", "too long");
        assert_eq!(errors.get("name").map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_merge_prefixed_nests_field_paths() {
        let mut outer = ValidationErrors::new();
        let mut inner = ValidationErrors::new();
        inner.add("sku", "duplicate");
        inner.add(NON_FIELD_ERRORS, "bad variant");
        outer.merge_prefixed("variants[1]", inner);

        assert!(outer.contains("variants[1].sku"));
        assert!(outer.contains("variants[1]"));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let errors = ValidationErrors::single("price", "must be positive");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "price": ["must be positive"] }));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(ValidationErrors::single("a", "b").into_result().is_err());
    }

    #[test]
    fn test_display_joins_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("a", "x");
        errors.add("b", "y");
        assert_eq!(errors.to_string(), "a: x; b: y");
    }
}
