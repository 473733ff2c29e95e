//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the session
//!   store (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `FLORIST_API_URL` - Flower API base URL (default: <http://localhost:8000/api>)
//! - `FLORIST_API_TIMEOUT_SECS` - Per-request timeout for the flower API (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default base URL of the flower API.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` URL of the session store (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Flower API connection settings
    pub api: ApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors reported to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Flower API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, including the `/api` prefix
    pub base_url: String,
    /// Timeout applied to every request
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = database_url(&env)?;
        let host = env.parsed("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parsed("STOREFRONT_PORT", "3000")?;
        let base_url = env.required("STOREFRONT_BASE_URL")?;

        let api = ApiConfig::from_source(&env)?;

        let sentry_sample_rate = env.rate("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = env.rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            api,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    /// Load only the flower API settings from the environment.
    ///
    /// Used by tooling that does not serve pages.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let lookup = |key: &str| std::env::var(key).ok();
        Self::from_source(&Env(&lookup))
    }

    fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        let base_url = env.or_default("FLORIST_API_URL", DEFAULT_API_URL);
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("FLORIST_API_URL".to_string(), e.to_string())
        })?;

        let secs: u64 = env.parsed(
            "FLORIST_API_TIMEOUT_SECS",
            &DEFAULT_API_TIMEOUT_SECS.to_string(),
        )?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(secs),
        })
    }
}

/// Load the session database URL from the environment.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `STOREFRONT_DATABASE_URL`
/// nor `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    let lookup = |key: &str| std::env::var(key).ok();
    database_url(&Env(&lookup))
}

fn database_url(env: &Env<'_>) -> Result<SecretString, ConfigError> {
    env.optional("STOREFRONT_DATABASE_URL")
        .or_else(|| env.optional("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the parsing helpers used above.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a sample rate and check it lies in `0.0..=1.0`.
    fn rate(&self, key: &str, default: &str) -> Result<f32, ConfigError> {
        let rate: f32 = self.parsed(key, default)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be between 0.0 and 1.0 (got {rate})"),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_source(|key| map.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("STOREFRONT_DATABASE_URL", "postgres://localhost/florist"),
        ("STOREFRONT_BASE_URL", "http://localhost:3000"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(MINIMAL).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert!(config.sentry_dsn.is_none());
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
        assert!(!config.is_https());
    }

    #[test]
    fn test_database_url_falls_back_to_generic() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("STOREFRONT_BASE_URL", "https://shop.example.com"),
        ])
        .unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
        assert!(config.is_https());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[("STOREFRONT_DATABASE_URL", "postgres://x/y")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_invalid_api_url() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("FLORIST_API_URL", "not a url"));
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "FLORIST_API_URL"));
    }

    #[test]
    fn test_sample_rate_out_of_range() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("SENTRY_TRACES_SAMPLE_RATE", "1.5"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("STOREFRONT_PORT", "http"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[
            ("STOREFRONT_DATABASE_URL", "postgres://user:hunter2@db/florist"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
        ])
        .unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
