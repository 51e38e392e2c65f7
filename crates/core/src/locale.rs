//! Language codes, request language negotiation, and translation fallback.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`LanguageCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageError {
    /// The input string is empty.
    #[error("language code cannot be empty")]
    Empty,
    /// The input is not `ll` or `ll-rr` shaped.
    #[error("invalid language code: {0}")]
    Invalid(String),
}

/// A BCP 47 style language tag, normalized to lowercase (`en`, `pt-br`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse and normalize a language tag.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is a 2-3 letter primary subtag,
    /// optionally followed by `-` or `_` and a 2-8 character alphanumeric region.
    pub fn parse(s: &str) -> Result<Self, LanguageError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LanguageError::Empty);
        }
        let normalized = s.replace('_', "-").to_ascii_lowercase();
        let mut parts = normalized.splitn(2, '-');
        let primary = parts.next().unwrap_or_default();
        let region = parts.next();

        let primary_ok =
            (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_lowercase());
        let region_ok = region.is_none_or(|r| {
            (2..=8).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric())
        });

        if primary_ok && region_ok {
            Ok(Self(normalized))
        } else {
            Err(LanguageError::Invalid(s.to_string()))
        }
    }

    /// The normalized tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary subtag (`pt` for `pt-br`).
    #[must_use]
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = LanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

/// Pick the best supported language for a request.
///
/// An explicit override (`?lang=`) wins when supported. Otherwise the
/// `Accept-Language` header is walked in descending quality order, matching
/// exact tags first and primary subtags second. Falls back to `default`.
#[must_use]
pub fn negotiate(
    explicit: Option<&str>,
    accept_language: Option<&str>,
    supported: &[LanguageCode],
    default: &LanguageCode,
) -> LanguageCode {
    if let Some(code) = explicit.and_then(|s| LanguageCode::parse(s).ok())
        && let Some(found) = match_supported(&code, supported)
    {
        return found;
    }

    let Some(header) = accept_language else {
        return default.clone();
    };

    let mut ranked: Vec<(f32, LanguageCode)> = header
        .split(',')
        .filter_map(|entry| {
            let mut pieces = entry.split(';');
            let tag = pieces.next()?.trim();
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if tag == "*" || quality <= 0.0 {
                return None;
            }
            LanguageCode::parse(tag).ok().map(|code| (quality, code))
        })
        .collect();
    // Stable sort keeps header order among equal weights.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked
        .iter()
        .find_map(|(_, code)| match_supported(code, supported))
        .unwrap_or_else(|| default.clone())
}

fn match_supported(code: &LanguageCode, supported: &[LanguageCode]) -> Option<LanguageCode> {
    supported
        .iter()
        .find(|s| *s == code)
        .or_else(|| supported.iter().find(|s| s.as_str() == code.primary()))
        .or_else(|| supported.iter().find(|s| s.primary() == code.primary()))
        .cloned()
}

/// Resolve a translatable field: the translated value when present, the base
/// value otherwise. Blank translated strings count as missing.
#[must_use]
pub fn fallback(base: String, translated: Option<String>) -> String {
    match translated {
        Some(t) if !t.trim().is_empty() => t,
        _ => base,
    }
}

/// Like [`fallback`] for fields that are optional on the base record.
#[must_use]
pub fn fallback_opt(base: Option<String>, translated: Option<String>) -> Option<String> {
    match translated {
        Some(t) if !t.trim().is_empty() => Some(t),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(s: &str) -> LanguageCode {
        LanguageCode::parse(s).unwrap()
    }

    fn supported() -> Vec<LanguageCode> {
        vec![lang("en"), lang("de"), lang("fr"), lang("pt-br")]
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(lang("EN").as_str(), "en");
        assert_eq!(lang("pt_BR").as_str(), "pt-br");
        assert_eq!(lang("pt-BR").primary(), "pt");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(LanguageCode::parse(""), Err(LanguageError::Empty));
        assert!(LanguageCode::parse("english").is_err());
        assert!(LanguageCode::parse("e1").is_err());
        assert!(LanguageCode::parse("en-").is_err());
    }

    #[test]
    fn test_explicit_override_wins() {
        let picked = negotiate(Some("fr"), Some("de"), &supported(), &lang("en"));
        assert_eq!(picked, lang("fr"));
    }

    #[test]
    fn test_unsupported_override_falls_through_to_header() {
        let picked = negotiate(Some("ja"), Some("de-AT,en;q=0.5"), &supported(), &lang("en"));
        assert_eq!(picked, lang("de"));
    }

    #[test]
    fn test_header_quality_ordering() {
        let picked = negotiate(None, Some("en;q=0.3, fr;q=0.9"), &supported(), &lang("en"));
        assert_eq!(picked, lang("fr"));
    }

    #[test]
    fn test_region_matches_primary() {
        let picked = negotiate(None, Some("pt-PT"), &supported(), &lang("en"));
        assert_eq!(picked, lang("pt-br"));
    }

    #[test]
    fn test_default_when_nothing_matches() {
        assert_eq!(negotiate(None, Some("ja, *"), &supported(), &lang("en")), lang("en"));
        assert_eq!(negotiate(None, None, &supported(), &lang("en")), lang("en"));
    }

    #[test]
    fn test_fallback_uses_base_without_translation() {
        assert_eq!(fallback("Shirt".into(), None), "Shirt");
        assert_eq!(fallback("Shirt".into(), Some("  ".into())), "Shirt");
        assert_eq!(fallback("Shirt".into(), Some("Hemd".into())), "Hemd");
        assert_eq!(fallback_opt(None, Some("Kurz".into())), Some("Kurz".into()));
        assert_eq!(fallback_opt(Some("Short".into()), None), Some("Short".into()));
    }
}
