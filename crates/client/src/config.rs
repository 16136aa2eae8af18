//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KICKFORGE_API_URL` - Base URL of the REST backend
//!
//! ## Optional
//! - `KICKFORGE_STORE_URL` - SQLite URL for the local store (default: `sqlite://kickforge.db`)
//! - `KICKFORGE_REQUEST_TIMEOUT_SECS` - HTTP timeout (default: 30)
//! - `KICKFORGE_AI_URL` - Image generation endpoint (default: `{api}/api/generate`)
//! - `KICKFORGE_AI_API_KEY` - Bearer key for the image generator
//! - `KICKFORGE_CHECKOUT_KEY_ID` - Public key id of the payment gateway
//! - `KICKFORGE_STORE_NAME` - Name shown on the payment sheet (default: Kickforge)
//! - `KICKFORGE_FREE_SHIPPING_THRESHOLD` - default 1000
//! - `KICKFORGE_SHIPPING_FEE` - default 50
//! - `KICKFORGE_TAX_RATE` - default 0.18
//! - `KICKFORGE_CURRENCY` - default INR
//! - `KICKFORGE_OTP_SECONDS` - OTP countdown budget (default: 600)
//! - `KICKFORGE_MAX_UPLOAD_BYTES` - Profile image limit (default: 2 MiB)
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use kickforge_core::otp::DEFAULT_OTP_SECONDS;
use kickforge_core::{CurrencyCode, PricingPolicy};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STORE_URL: &str = "sqlite://kickforge.db";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST backend base URL
    pub api_url: Url,
    /// SQLite URL of the local store
    pub store_url: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Image generator configuration
    pub generator: GeneratorConfig,
    /// Payment gateway configuration
    pub checkout: CheckoutConfig,
    /// Shipping and tax rules
    pub pricing: PricingPolicy,
    /// OTP countdown budget in seconds
    pub otp_seconds: u32,
    /// Maximum profile image size in bytes
    pub max_upload_bytes: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Image generator configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Endpoint accepting `{prompt}` and returning `{image}`
    pub url: Url,
    /// Optional bearer key
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Public key id handed to the gateway SDK
    pub key_id: Option<String>,
    /// Merchant name shown on the payment sheet
    pub store_name: String,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the generator key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_url("KICKFORGE_API_URL", &get_required_env("KICKFORGE_API_URL")?)?;
        let store_url = get_env_or_default("KICKFORGE_STORE_URL", DEFAULT_STORE_URL);
        let request_timeout =
            Duration::from_secs(parse_env_or("KICKFORGE_REQUEST_TIMEOUT_SECS", 30_u64)?);

        let generator = GeneratorConfig::from_env(&api_url)?;
        let checkout = CheckoutConfig {
            key_id: get_optional_env("KICKFORGE_CHECKOUT_KEY_ID"),
            store_name: get_env_or_default("KICKFORGE_STORE_NAME", "Kickforge"),
        };
        let pricing = pricing_from_env()?;

        Ok(Self {
            api_url,
            store_url,
            request_timeout,
            generator,
            checkout,
            pricing,
            otp_seconds: parse_env_or("KICKFORGE_OTP_SECONDS", DEFAULT_OTP_SECONDS)?,
            max_upload_bytes: parse_env_or("KICKFORGE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at a backend URL with every other value at its
    /// default and an in-memory store. Used by tests and tooling.
    #[must_use]
    pub fn for_api(api_url: Url) -> Self {
        let generator = GeneratorConfig {
            url: default_generator_url(&api_url),
            api_key: None,
        };
        Self {
            api_url,
            store_url: "sqlite::memory:".to_owned(),
            request_timeout: Duration::from_secs(30),
            generator,
            checkout: CheckoutConfig {
                key_id: None,
                store_name: "Kickforge".to_owned(),
            },
            pricing: PricingPolicy::default(),
            otp_seconds: DEFAULT_OTP_SECONDS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl GeneratorConfig {
    fn from_env(api_url: &Url) -> Result<Self, ConfigError> {
        let url = match get_optional_env("KICKFORGE_AI_URL") {
            Some(raw) => parse_url("KICKFORGE_AI_URL", &raw)?,
            None => default_generator_url(api_url),
        };
        let api_key = get_optional_env("KICKFORGE_AI_API_KEY")
            .map(|key| {
                validate_secret_strength(&key, "KICKFORGE_AI_API_KEY")?;
                Ok::<_, ConfigError>(SecretString::from(key))
            })
            .transpose()?;
        Ok(Self { url, api_key })
    }
}

/// `{api}/api/generate`, keeping any base path the API is mounted under.
fn default_generator_url(api_url: &Url) -> Url {
    let mut url = api_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(["api", "generate"]);
    }
    url
}

fn pricing_from_env() -> Result<PricingPolicy, ConfigError> {
    let defaults = PricingPolicy::default();
    let currency = get_optional_env("KICKFORGE_CURRENCY")
        .map(|raw| {
            CurrencyCode::from_str(&raw).map_err(|e| {
                ConfigError::InvalidEnvVar("KICKFORGE_CURRENCY".to_string(), e.to_string())
            })
        })
        .transpose()?
        .unwrap_or(defaults.currency);

    let policy = PricingPolicy {
        free_shipping_threshold: parse_env_or(
            "KICKFORGE_FREE_SHIPPING_THRESHOLD",
            defaults.free_shipping_threshold,
        )?,
        shipping_fee: parse_env_or("KICKFORGE_SHIPPING_FEE", defaults.shipping_fee)?,
        tax_rate: parse_env_or("KICKFORGE_TAX_RATE", defaults.tax_rate)?,
        currency,
    };

    if policy.tax_rate.is_sign_negative() || policy.tax_rate >= Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            "KICKFORGE_TAX_RATE".to_string(),
            "must be a fraction between 0 and 1".to_string(),
        ));
    }
    if policy.shipping_fee.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            "KICKFORGE_SHIPPING_FEE".to_string(),
            "must not be negative".to_string(),
        ));
    }

    Ok(policy)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to a default.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("hf_Zq8xT2mLw9Rk4Vb7") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-ai-key", "K"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaa", "K").is_err());
        assert!(validate_secret_strength("hf_Zq8xT2mLw9Rk4Vb7nP3s", "K").is_ok());
    }

    #[test]
    fn test_default_generator_url() {
        let api = Url::parse("https://api.kickforge.in").unwrap();
        assert_eq!(
            default_generator_url(&api).as_str(),
            "https://api.kickforge.in/api/generate"
        );
    }

    #[test]
    fn test_default_generator_url_keeps_base_path() {
        let api = Url::parse("https://kickforge.in/backend/").unwrap();
        assert_eq!(
            default_generator_url(&api).as_str(),
            "https://kickforge.in/backend/api/generate"
        );
        let api = Url::parse("https://kickforge.in/backend").unwrap();
        assert_eq!(
            default_generator_url(&api).as_str(),
            "https://kickforge.in/backend/api/generate"
        );
        let config = ClientConfig::for_api(api);
        assert_eq!(
            config.generator.url.as_str(),
            "https://kickforge.in/backend/api/generate"
        );
    }

    #[test]
    fn test_for_api_defaults() {
        let config = ClientConfig::for_api(Url::parse("http://127.0.0.1:9000").unwrap());
        assert_eq!(config.store_url, "sqlite::memory:");
        assert_eq!(config.otp_seconds, 600);
        assert_eq!(config.pricing, PricingPolicy::default());
        assert!(config.checkout.key_id.is_none());
    }

    #[test]
    fn test_generator_debug_redacts_key() {
        let config = GeneratorConfig {
            url: Url::parse("https://gen.kickforge.in").unwrap(),
            api_key: Some(SecretString::from("hf_super_secret_value")),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hf_super_secret_value"));
    }
}
