//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of this server
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `CLIENT_BASE_URL` - Browser client origin allowed by CORS, with credentials
//! - `SESSION_EXPIRY_HOURS` - Session inactivity expiry and guest cart lifetime (default: 24)
//! - `CART_ENFORCE_STOCK` - Reject cart quantities above stock (default: true)
//! - `CART_MAX_WRITE_ATTEMPTS` - Attempts per cart write under contention (default: 3)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

use crate::services::cart::CartPolicy;

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
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this server
    pub base_url: String,
    /// Origin of the browser client, if it is served from elsewhere
    pub client_base_url: Option<String>,
    /// Hours of inactivity before a session (and its guest cart) expires
    pub session_expiry_hours: u32,
    /// Cart write and stock policy
    pub cart: CartPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
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

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(vars: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get_database_url(vars, "STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default(vars, "STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = get_parsed_or_default(vars, "STOREFRONT_PORT", 3000)?;
        let base_url = get_required_env(vars, "STOREFRONT_BASE_URL")?;
        let client_base_url = vars("CLIENT_BASE_URL");
        let session_expiry_hours = get_parsed_or_default(vars, "SESSION_EXPIRY_HOURS", 24)?;
        if session_expiry_hours == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SESSION_EXPIRY_HOURS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let defaults = CartPolicy::default();
        let cart = CartPolicy {
            enforce_stock: get_parsed_or_default(vars, "CART_ENFORCE_STOCK", defaults.enforce_stock)?,
            max_write_attempts: get_parsed_or_default(
                vars,
                "CART_MAX_WRITE_ATTEMPTS",
                defaults.max_write_attempts,
            )?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            client_base_url,
            session_expiry_hours,
            cart,
            sentry_dsn: vars("SENTRY_DSN"),
            sentry_environment: vars("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default(vars, "SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_parsed_or_default(
                vars,
                "SENTRY_TRACES_SAMPLE_RATE",
                0.0,
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the server is reached over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Session and guest cart lifetime.
    #[must_use]
    pub fn session_expiry(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_expiry_hours))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(
    vars: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    vars(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    vars: &dyn Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    vars(primary_key)
        .or_else(|| vars("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or_default<T>(
    vars: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
