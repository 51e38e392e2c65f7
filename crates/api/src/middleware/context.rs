//! Per-request language and currency.
//!
//! Language comes from `?lang=`, then `Accept-Language`; currency from
//! `?currency=`, then the `X-Currency` header. Unsupported values fall back
//! to the configured defaults without an error.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use emporium_core::CurrencyCode;
use emporium_core::locale::{LanguageCode, negotiate};

use crate::config::LocaleConfig;
use crate::state::AppState;

/// Header naming the display currency.
pub const CURRENCY_HEADER: &str = "x-currency";

/// The negotiated language and display currency of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub language: LanguageCode,
    pub currency: CurrencyCode,
    is_default_language: bool,
}

impl RequestContext {
    /// Negotiate the context from a request's URI and headers.
    #[must_use]
    pub fn resolve(uri: &Uri, headers: &HeaderMap, locale: &LocaleConfig) -> Self {
        let mut lang_param = None;
        let mut currency_param = None;
        if let Some(query) = uri.query() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                match key.as_ref() {
                    "lang" => lang_param = Some(value.into_owned()),
                    "currency" => currency_param = Some(value.into_owned()),
                    _ => {}
                }
            }
        }

        let accept_language = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());
        let language = negotiate(
            lang_param.as_deref(),
            accept_language,
            &locale.languages,
            &locale.default_language,
        );

        let currency_header = headers.get(CURRENCY_HEADER).and_then(|v| v.to_str().ok());
        let currency = [currency_param.as_deref(), currency_header]
            .into_iter()
            .flatten()
            .filter_map(|raw| raw.parse::<CurrencyCode>().ok())
            .find(|code| locale.currencies.contains(code))
            .unwrap_or(locale.base_currency);

        Self {
            is_default_language: language == locale.default_language,
            language,
            currency,
        }
    }

    /// The same context with a different language.
    #[must_use]
    pub fn with_language(self, language: LanguageCode, locale: &LocaleConfig) -> Self {
        Self {
            is_default_language: language == locale.default_language,
            language,
            ..self
        }
    }

    /// The language whose translations should be overlaid, or `None` when
    /// the request uses the default language.
    #[must_use]
    pub fn translation(&self) -> Option<&LanguageCode> {
        (!self.is_default_language).then_some(&self.language)
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(&parts.uri, &parts.headers, &state.config().locale))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn locale() -> LocaleConfig {
        LocaleConfig::parse("en", Some("de,fr"), "USD", Some("EUR,GBP")).unwrap()
    }

    fn resolve(uri: &str, headers: &[(&'static str, &'static str)]) -> RequestContext {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(value));
        }
        RequestContext::resolve(&uri.parse().unwrap(), &map, &locale())
    }

    #[test]
    fn test_defaults() {
        let ctx = resolve("/api/products", &[]);
        assert_eq!(ctx.language.as_str(), "en");
        assert_eq!(ctx.currency, CurrencyCode::USD);
        assert!(ctx.translation().is_none());
    }

    #[test]
    fn test_query_beats_headers() {
        let ctx = resolve(
            "/api/products?lang=fr&currency=gbp",
            &[("accept-language", "de"), ("x-currency", "EUR")],
        );
        assert_eq!(ctx.language.as_str(), "fr");
        assert_eq!(ctx.currency, CurrencyCode::GBP);
        assert_eq!(ctx.translation().map(LanguageCode::as_str), Some("fr"));
    }

    #[test]
    fn test_headers_used_without_query() {
        let ctx = resolve(
            "/api/products",
            &[("accept-language", "de-AT, en;q=0.5"), ("x-currency", "EUR")],
        );
        assert_eq!(ctx.language.as_str(), "de");
        assert_eq!(ctx.currency, CurrencyCode::EUR);
    }

    #[test]
    fn test_unsupported_values_fall_back() {
        let ctx = resolve("/api/products?lang=ja&currency=JPY", &[("x-currency", "XYZ")]);
        assert_eq!(ctx.language.as_str(), "en");
        assert_eq!(ctx.currency, CurrencyCode::USD);
    }

    #[test]
    fn test_with_language() {
        let ctx = resolve("/api/products?currency=EUR", &[]);
        let ctx = ctx.with_language(LanguageCode::parse("de").unwrap(), &locale());
        assert_eq!(ctx.translation().map(LanguageCode::as_str), Some("de"));
        assert_eq!(ctx.currency, CurrencyCode::EUR);
    }

    #[test]
    fn test_unsupported_query_currency_falls_through_to_header() {
        let ctx = resolve("/api/products?currency=JPY", &[("x-currency", "GBP")]);
        assert_eq!(ctx.currency, CurrencyCode::GBP);
    }
}
