//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KIOSK_BACKEND_URL` - Base URL of the hosted backend project
//! - `KIOSK_BACKEND_ANON_KEY` - Publishable (anonymous) API key
//!
//! ## Optional
//! - `KIOSK_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

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
    /// Base URL of the hosted backend project.
    pub backend_url: Url,
    /// Publishable API key; every request carries it, signed-in requests
    /// add the session token on top.
    pub anon_key: SecretString,
    /// Per-request timeout. A timed-out call surfaces as
    /// `GatewayError::Timeout` and is never retried automatically.
    pub request_timeout: Duration,
}

impl StorefrontConfig {
    /// Load configuration, reading a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is missing or
    /// invalid.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is missing or
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = required("KIOSK_BACKEND_URL")?;
        let backend_url: Url = backend_url
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar("KIOSK_BACKEND_URL".into(), format!("{e}")))?;

        let anon_key = SecretString::from(required("KIOSK_BACKEND_ANON_KEY")?);

        let request_timeout = match std::env::var("KIOSK_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|e| {
                ConfigError::InvalidEnvVar("KIOSK_REQUEST_TIMEOUT_SECS".into(), format!("{e}"))
            })?),
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            backend_url,
            anon_key,
            request_timeout,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}
