//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `EMPORIUM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `EMPORIUM_BASE_URL` - Public URL of the API
//! - `EMPORIUM_API_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `EMPORIUM_HOST` - Bind address (default: 127.0.0.1)
//! - `EMPORIUM_PORT` - Listen port (default: 8000)
//! - `EMPORIUM_DEFAULT_LANGUAGE` - Default content language (default: en)
//! - `EMPORIUM_LANGUAGES` - Comma-separated supported languages (default: the default language)
//! - `EMPORIUM_BASE_CURRENCY` - Currency prices are entered in (default: USD)
//! - `EMPORIUM_CURRENCIES` - Comma-separated display currencies (default: the base currency)
//! - `EMPORIUM_PAGE_CACHE_TTL_SECS` - Public GET response cache lifetime (default: 900)
//! - `EMPORIUM_RATES_URL` - Exchange-rate endpoint; unset uses `EMPORIUM_FIXED_RATES`
//! - `EMPORIUM_RATES_API_KEY` - Bearer key for the exchange-rate endpoint
//! - `EMPORIUM_FIXED_RATES` - Static rates, e.g. `EUR=0.91,GBP=0.79`
//! - `EMPORIUM_RATES_REFRESH_HOURS` - Background refresh interval; unset disables it
//! - `EMPORIUM_STORAGE` - `local` (default) or `cdn`
//! - `EMPORIUM_MEDIA_ROOT` - Local storage directory (default: ./media)
//! - `EMPORIUM_MEDIA_URL` - Public URL prefix for local media (default: `{base_url}/media`)
//! - `CDN_UPLOAD_URL`, `CDN_API_URL`, `CDN_URL_ENDPOINT`, `CDN_PRIVATE_KEY`, `CDN_FOLDER`
//!   - Media CDN settings, required when `EMPORIUM_STORAGE=cdn`
//! - `EMPORIUM_ADMIN_BUNDLE_DIR` - Directory served at `/admin` (default: ./admin-bundle)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use emporium_core::CurrencyCode;
use emporium_core::locale::LanguageCode;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_API_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Bearer token signing secret
    pub api_secret: SecretString,
    /// Language and currency settings
    pub locale: LocaleConfig,
    /// Lifetime of cached public GET responses
    pub page_cache_ttl: Duration,
    /// Exchange-rate source settings
    pub rates: RatesConfig,
    /// Media storage backend
    pub storage: StorageConfig,
    /// Directory served at `/admin`
    pub admin_bundle_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Supported languages and currencies.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    pub default_language: LanguageCode,
    /// Always contains `default_language`.
    pub languages: Vec<LanguageCode>,
    pub base_currency: CurrencyCode,
    /// Always contains `base_currency`.
    pub currencies: Vec<CurrencyCode>,
}

/// Where exchange rates come from.
#[derive(Clone)]
pub struct RatesConfig {
    /// HTTP endpoint returning `{"rates": {...}}`; `None` uses `fixed`.
    pub url: Option<url::Url>,
    pub api_key: Option<SecretString>,
    /// Static base-to-target rates.
    pub fixed: HashMap<CurrencyCode, Decimal>,
    /// Background refresh interval; `None` disables the task.
    pub refresh_interval: Option<Duration>,
}

impl std::fmt::Debug for RatesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatesConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("fixed", &self.fixed)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

/// Media storage backend selection.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local {
        root: PathBuf,
        base_url: String,
    },
    Cdn(CdnConfig),
}

/// Media CDN configuration.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct CdnConfig {
    /// Multipart upload endpoint
    pub upload_url: url::Url,
    /// Management API base (file lookup and deletion)
    pub api_url: url::Url,
    /// Public delivery URL prefix
    pub url_endpoint: url::Url,
    /// Private API key, sent as the basic-auth user name
    pub private_key: SecretString,
    /// Folder all media is stored under
    pub folder: String,
}

impl std::fmt::Debug for CdnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnConfig")
            .field("upload_url", &self.upload_url.as_str())
            .field("api_url", &self.api_url.as_str())
            .field("url_endpoint", &self.url_endpoint.as_str())
            .field("private_key", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("EMPORIUM_DATABASE_URL")?;
        let host = parse_env("EMPORIUM_HOST", "127.0.0.1")?;
        let port = parse_env("EMPORIUM_PORT", "8000")?;
        let base_url = get_required_env("EMPORIUM_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let api_secret = get_validated_secret("EMPORIUM_API_SECRET")?;
        validate_secret_length(&api_secret, "EMPORIUM_API_SECRET")?;

        let locale = LocaleConfig::from_env()?;
        let page_cache_ttl = Duration::from_secs(parse_env("EMPORIUM_PAGE_CACHE_TTL_SECS", "900")?);
        let rates = RatesConfig::from_env()?;
        let storage = StorageConfig::from_env(&base_url)?;
        let admin_bundle_dir =
            PathBuf::from(get_env_or_default("EMPORIUM_ADMIN_BUNDLE_DIR", "./admin-bundle"));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            api_secret,
            locale,
            page_cache_ttl,
            rates,
            storage,
            admin_bundle_dir,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl LocaleConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let default_language = get_env_or_default("EMPORIUM_DEFAULT_LANGUAGE", "en");
        let languages = get_optional_env("EMPORIUM_LANGUAGES");
        let base_currency = get_env_or_default("EMPORIUM_BASE_CURRENCY", "USD");
        let currencies = get_optional_env("EMPORIUM_CURRENCIES");
        Self::parse(
            &default_language,
            languages.as_deref(),
            &base_currency,
            currencies.as_deref(),
        )
    }

    /// Build locale settings from raw values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for malformed language tags or
    /// unsupported currency codes.
    pub fn parse(
        default_language: &str,
        languages: Option<&str>,
        base_currency: &str,
        currencies: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let default_language = LanguageCode::parse(default_language).map_err(|e| {
            ConfigError::InvalidEnvVar("EMPORIUM_DEFAULT_LANGUAGE".to_string(), e.to_string())
        })?;
        let mut parsed_languages = vec![default_language.clone()];
        for raw in split_list(languages) {
            let code = LanguageCode::parse(raw).map_err(|e| {
                ConfigError::InvalidEnvVar("EMPORIUM_LANGUAGES".to_string(), e.to_string())
            })?;
            if !parsed_languages.contains(&code) {
                parsed_languages.push(code);
            }
        }

        let base_currency: CurrencyCode = base_currency.parse().map_err(|e: emporium_core::UnknownCurrency| {
            ConfigError::InvalidEnvVar("EMPORIUM_BASE_CURRENCY".to_string(), e.to_string())
        })?;
        let mut parsed_currencies = vec![base_currency];
        for raw in split_list(currencies) {
            let code: CurrencyCode = raw.parse().map_err(|e: emporium_core::UnknownCurrency| {
                ConfigError::InvalidEnvVar("EMPORIUM_CURRENCIES".to_string(), e.to_string())
            })?;
            if !parsed_currencies.contains(&code) {
                parsed_currencies.push(code);
            }
        }

        Ok(Self {
            default_language,
            languages: parsed_languages,
            base_currency,
            currencies: parsed_currencies,
        })
    }
}

impl RatesConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = get_optional_env("EMPORIUM_RATES_URL")
            .map(|raw| {
                url::Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("EMPORIUM_RATES_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;
        let fixed = parse_fixed_rates(get_optional_env("EMPORIUM_FIXED_RATES").as_deref())?;
        let refresh_interval = get_optional_env("EMPORIUM_RATES_REFRESH_HOURS")
            .map(|raw| {
                raw.parse::<u64>()
                    .ok()
                    .filter(|h| *h > 0)
                    .map(|h| Duration::from_secs(h * 3600))
                    .ok_or_else(|| {
                        ConfigError::InvalidEnvVar(
                            "EMPORIUM_RATES_REFRESH_HOURS".to_string(),
                            "must be a positive number of hours".to_string(),
                        )
                    })
            })
            .transpose()?;

        Ok(Self {
            url,
            api_key: get_optional_env("EMPORIUM_RATES_API_KEY").map(SecretString::from),
            fixed,
            refresh_interval,
        })
    }
}

impl StorageConfig {
    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        match get_env_or_default("EMPORIUM_STORAGE", "local").as_str() {
            "local" => Ok(Self::Local {
                root: PathBuf::from(get_env_or_default("EMPORIUM_MEDIA_ROOT", "./media")),
                base_url: get_optional_env("EMPORIUM_MEDIA_URL")
                    .unwrap_or_else(|| format!("{base_url}/media"))
                    .trim_end_matches('/')
                    .to_string(),
            }),
            "cdn" => Ok(Self::Cdn(CdnConfig {
                upload_url: get_required_url("CDN_UPLOAD_URL")?,
                api_url: get_required_url("CDN_API_URL")?,
                url_endpoint: get_required_url("CDN_URL_ENDPOINT")?,
                private_key: get_validated_secret("CDN_PRIVATE_KEY")?,
                folder: get_env_or_default("CDN_FOLDER", "emporium")
                    .trim_matches('/')
                    .to_string(),
            })),
            other => Err(ConfigError::InvalidEnvVar(
                "EMPORIUM_STORAGE".to_string(),
                format!("expected `local` or `cdn`, got `{other}`"),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required URL-valued environment variable.
fn get_required_url(key: &str) -> Result<url::Url, ConfigError> {
    let raw = get_required_env(key)?;
    url::Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse `EUR=0.91,GBP=0.79` into a rate table.
fn parse_fixed_rates(raw: Option<&str>) -> Result<HashMap<CurrencyCode, Decimal>, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("EMPORIUM_FIXED_RATES".to_string(), msg);
    let mut rates = HashMap::new();
    for entry in split_list(raw) {
        let (code, rate) = entry
            .split_once('=')
            .ok_or_else(|| invalid(format!("expected CODE=RATE, got `{entry}`")))?;
        let code: CurrencyCode = code.parse().map_err(|e: emporium_core::UnknownCurrency| invalid(e.to_string()))?;
        let rate: Decimal = rate
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid rate for {code}")))?;
        if rate <= Decimal::ZERO {
            return Err(invalid(format!("rate for {code} must be positive")));
        }
        rates.insert(code, rate);
    }
    Ok(rates)
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_API_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_API_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_locale_parse_includes_defaults() {
        let locale = LocaleConfig::parse("en", Some("de, fr,en"), "EUR", Some("USD,EUR")).unwrap();
        let langs: Vec<_> = locale.languages.iter().map(LanguageCode::as_str).collect();
        assert_eq!(langs, vec!["en", "de", "fr"]);
        assert_eq!(locale.base_currency, CurrencyCode::EUR);
        assert_eq!(locale.currencies, vec![CurrencyCode::EUR, CurrencyCode::USD]);
    }

    #[test]
    fn test_locale_parse_rejects_unknown_currency() {
        let err = LocaleConfig::parse("en", None, "XYZ", None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "EMPORIUM_BASE_CURRENCY"));
    }

    #[test]
    fn test_parse_fixed_rates() {
        let rates = parse_fixed_rates(Some("EUR=0.91, GBP = 0.79")).unwrap();
        assert_eq!(rates[&CurrencyCode::EUR], "0.91".parse().unwrap());
        assert_eq!(rates[&CurrencyCode::GBP], "0.79".parse().unwrap());
        assert!(parse_fixed_rates(None).unwrap().is_empty());
        assert!(parse_fixed_rates(Some("EUR")).is_err());
        assert!(parse_fixed_rates(Some("EUR=-1")).is_err());
    }

    #[test]
    fn test_cdn_config_debug_redacts_key() {
        let config = CdnConfig {
            upload_url: url::Url::parse("https://upload.cdn.test/api/v1/files/upload").unwrap(),
            api_url: url::Url::parse("https://api.cdn.test/v1").unwrap(),
            url_endpoint: url::Url::parse("https://media.cdn.test/shop").unwrap(),
            private_key: SecretString::from("private_live_key_value"),
            folder: "catalog".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("media.cdn.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("private_live_key_value"));
    }
}
