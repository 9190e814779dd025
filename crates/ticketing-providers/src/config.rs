//! Provider endpoint configuration.
//!
//! Centralizes the URLs, credentials and timeout for every external service
//! the auth core talks to. Configuration is loaded from environment variables
//! with defaults for local development.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

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

/// Configuration for all external providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identity provider (token verification, session revocation).
    pub identity: Endpoint,

    /// Messaging provider (template OTP delivery).
    pub messaging: MessagingConfig,

    /// External profile service.
    pub profile: Endpoint,

    /// Request timeout in seconds, applied to every provider call.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            identity: Endpoint {
                base_url: "http://localhost:9099".to_string(),
                api_key: None,
            },
            messaging: MessagingConfig::default(),
            profile: Endpoint {
                base_url: "http://localhost:3001".to_string(),
                api_key: None,
            },
            timeout_secs: 10,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `IDENTITY_API_URL`: Identity provider URL (default: http://localhost:9099)
    /// - `IDENTITY_API_KEY`: Identity provider API key
    /// - `MESSAGING_API_URL`: Messaging API URL (default: https://business.openapi.zalo.me)
    /// - `MESSAGING_OAUTH_URL`: Messaging OAuth URL (default: https://oauth.zaloapp.com)
    /// - `MESSAGING_APP_ID`: Messaging application id
    /// - `MESSAGING_APP_SECRET`: Messaging application secret
    /// - `MESSAGING_REFRESH_TOKEN`: Initial messaging refresh token
    /// - `PROFILE_API_URL`: Profile service URL (default: http://localhost:3001)
    /// - `PROVIDER_TIMEOUT_SECS`: Request timeout in seconds (default: 10)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            identity: Endpoint {
                base_url: std::env::var("IDENTITY_API_URL").unwrap_or(default.identity.base_url),
                api_key: std::env::var("IDENTITY_API_KEY").ok(),
            },
            messaging: MessagingConfig {
                api_url: std::env::var("MESSAGING_API_URL").unwrap_or(default.messaging.api_url),
                oauth_url: std::env::var("MESSAGING_OAUTH_URL")
                    .unwrap_or(default.messaging.oauth_url),
                app_id: std::env::var("MESSAGING_APP_ID").ok(),
                app_secret: std::env::var("MESSAGING_APP_SECRET").ok(),
                refresh_token: std::env::var("MESSAGING_REFRESH_TOKEN").ok(),
            },
            profile: Endpoint {
                base_url: std::env::var("PROFILE_API_URL").unwrap_or(default.profile.base_url),
                api_key: None,
            },
            timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
        }
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate that all required configuration is present for production.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.identity.api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("IDENTITY_API_KEY".to_string()));
        }
        if self.messaging.app_id.is_none() {
            return Err(ConfigError::MissingEnvVar("MESSAGING_APP_ID".to_string()));
        }
        if self.messaging.app_secret.is_none() {
            return Err(ConfigError::MissingEnvVar("MESSAGING_APP_SECRET".to_string()));
        }
        if self.messaging.refresh_token.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "MESSAGING_REFRESH_TOKEN".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PROVIDER_TIMEOUT_SECS".to_string(),
                message: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for a single HTTP service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL for the service (e.g., "https://identity.example.com").
    pub base_url: String,

    /// API key for service-to-service authentication.
    pub api_key: Option<String>,
}

impl Endpoint {
    /// Create an endpoint without credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Build a full URL by appending a path to the base URL.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

/// Messaging provider endpoints and application credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Template message API base URL.
    pub api_url: String,

    /// OAuth base URL used to refresh the access token.
    pub oauth_url: String,

    /// Application id.
    pub app_id: Option<String>,

    /// Application secret, sent as the `secret_key` header on refresh.
    pub app_secret: Option<String>,

    /// Refresh token used to obtain the first access token.
    pub refresh_token: Option<String>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            api_url: "https://business.openapi.zalo.me".to_string(),
            oauth_url: "https://oauth.zaloapp.com".to_string(),
            app_id: None,
            app_secret: None,
            refresh_token: None,
        }
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}
