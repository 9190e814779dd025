//! Authentication configuration.
//!
//! Token secrets and lifetimes plus the OTP policy. Loaded from environment
//! variables with defaults suitable for local development.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Minimum secret length accepted in production.
pub const MIN_SECRET_LEN: usize = 32;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Authentication configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    pub access_secret: String,

    /// HMAC secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,

    /// Token issuer.
    pub issuer: String,

    /// Access token lifetime in seconds. Also the whitelist entry TTL.
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: u64,

    /// OTP lifetime in seconds.
    pub otp_ttl_secs: u64,

    /// OTP requests allowed per phone number per window.
    pub otp_max_requests: u32,

    /// Rate-limit window in seconds, measured from the first request.
    pub otp_window_secs: u64,

    /// Messaging template used for OTP delivery.
    pub otp_template_id: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("otp_ttl_secs", &self.otp_ttl_secs)
            .field("otp_max_requests", &self.otp_max_requests)
            .field("otp_window_secs", &self.otp_window_secs)
            .field("otp_template_id", &self.otp_template_id)
            .finish()
    }
}

impl Default for AuthConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            access_secret: "dev-access-secret-change-me-0000000000".to_string(),
            refresh_secret: "dev-refresh-secret-change-me-000000000".to_string(),
            issuer: "ticketing-auth".to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7 * 24 * 3600,
            otp_ttl_secs: 120,
            otp_max_requests: 4,
            otp_window_secs: 24 * 3600,
            otp_template_id: "487517".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `JWT_ACCESS_SECRET`: Access token secret
    /// - `JWT_REFRESH_SECRET`: Refresh token secret
    /// - `JWT_ISSUER`: Token issuer (default: ticketing-auth)
    /// - `JWT_ACCESS_TTL_SECS`: Access token lifetime (default: 3600)
    /// - `JWT_REFRESH_TTL_SECS`: Refresh token lifetime (default: 604800)
    /// - `OTP_TTL_SECS`: OTP lifetime (default: 120)
    /// - `OTP_MAX_REQUESTS`: OTP requests per window (default: 4)
    /// - `OTP_WINDOW_SECS`: Rate-limit window (default: 86400)
    /// - `OTP_TEMPLATE_ID`: Messaging template for OTP delivery
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            access_secret: std::env::var("JWT_ACCESS_SECRET").unwrap_or(default.access_secret),
            refresh_secret: std::env::var("JWT_REFRESH_SECRET").unwrap_or(default.refresh_secret),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(default.issuer),
            access_ttl_secs: env_parse("JWT_ACCESS_TTL_SECS", default.access_ttl_secs),
            refresh_ttl_secs: env_parse("JWT_REFRESH_TTL_SECS", default.refresh_ttl_secs),
            otp_ttl_secs: env_parse("OTP_TTL_SECS", default.otp_ttl_secs),
            otp_max_requests: env_parse("OTP_MAX_REQUESTS", default.otp_max_requests),
            otp_window_secs: env_parse("OTP_WINDOW_SECS", default.otp_window_secs),
            otp_template_id: std::env::var("OTP_TEMPLATE_ID").unwrap_or(default.otp_template_id),
        }
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    /// OTP lifetime.
    pub fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl_secs)
    }

    /// Rate-limit window.
    pub fn otp_window(&self) -> Duration {
        Duration::from_secs(self.otp_window_secs)
    }

    /// Validate that the configuration is safe for production.
    ///
    /// Secrets must be set explicitly, be at least [`MIN_SECRET_LEN`] bytes,
    /// and differ from each other.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if std::env::var("JWT_ACCESS_SECRET").is_err() {
            return Err(ConfigError::MissingEnvVar("JWT_ACCESS_SECRET".to_string()));
        }
        if std::env::var("JWT_REFRESH_SECRET").is_err() {
            return Err(ConfigError::MissingEnvVar("JWT_REFRESH_SECRET".to_string()));
        }
        self.validate()
    }

    /// Validate values without consulting the environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, secret) in [
            ("JWT_ACCESS_SECRET", &self.access_secret),
            ("JWT_REFRESH_SECRET", &self.refresh_secret),
        ] {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("secret must be at least {} bytes", MIN_SECRET_LEN),
                });
            }
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue {
                key: "JWT_REFRESH_SECRET".to_string(),
                message: "access and refresh secrets must differ".to_string(),
            });
        }
        if self.access_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_ACCESS_TTL_SECS".to_string(),
                message: "token lifetimes must be positive".to_string(),
            });
        }
        if self.otp_max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                key: "OTP_MAX_REQUESTS".to_string(),
                message: "at least one request per window is required".to_string(),
            });
        }
        Ok(())
    }
}
