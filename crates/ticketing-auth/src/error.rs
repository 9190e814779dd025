//! Error types for authentication operations
//!
//! This module defines the closed set of failures the auth core reports.
//! The boundary layer maps [`ErrorKind`] (or `status_code()`) to its
//! transport; internal detail stays in the logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ticketing_accounts::StoreError;
use ticketing_cache::CacheError;
use ticketing_providers::ProviderError;

/// Why a presented token was refused.
///
/// Logged for diagnosis; every reason surfaces as
/// [`AuthError::InvalidCredential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    /// Not a decodable JWT
    Malformed,
    /// Signature does not verify under the expected key
    BadSignature,
    /// Past its expiry
    Expired,
    /// Issued for the other purpose
    PurposeMismatch,
    /// Issuer or required claims are wrong
    InvalidClaims,
}

impl TokenRejection {
    /// Get string representation of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::PurposeMismatch => "purpose_mismatch",
            Self::InvalidClaims => "invalid_claims",
        }
    }
}

impl std::fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of failure kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential failed verification or has expired
    InvalidCredential,
    /// Credential verified but is no longer trusted
    Unauthorized,
    /// Account already exists
    Conflict,
    /// Account does not exist
    NotFound,
    /// Per-phone OTP quota exhausted
    RateLimited,
    /// Identity or profile service failed
    ProviderUnavailable,
    /// OTP could not be delivered
    DeliveryFailed,
    /// Input rejected before any side effect
    Validation,
    /// Unexpected failure
    Internal,
}

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad or expired federated token, OTP, or platform token
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Credential is well-formed but no longer trusted (superseded refresh token)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Account already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Account does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// OTP request quota exhausted
    #[error("Too many OTP requests: limit of {max_attempts} reached, retry in {retry_after_secs}s")]
    RateLimited {
        /// Requests allowed per window
        max_attempts: u32,
        /// Seconds until the window resets
        retry_after_secs: u64,
        /// When the window resets
        reset_at: DateTime<Utc>,
    },

    /// Upstream identity or profile service failed or timed out
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// OTP could not be delivered
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Input rejected before any store was touched
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unexpected failure; detail is logged, not returned
    #[error("Internal error")]
    Internal(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Build an internal error, logging the detail.
    pub fn internal(context: &str, detail: impl std::fmt::Display) -> Self {
        tracing::error!(context, error = %detail, "Internal auth failure");
        AuthError::Internal(format!("{}: {}", context, detail))
    }

    /// Failure kind for boundary mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            AuthError::Unauthorized(_) => ErrorKind::Unauthorized,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::RateLimited { .. } => ErrorKind::RateLimited,
            AuthError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            AuthError::DeliveryFailed(_) => ErrorKind::DeliveryFailed,
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error should be logged at error level.
    ///
    /// Expected failures (bad credentials, rate limits) are not.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::Internal(_) | AuthError::ProviderUnavailable(_) | AuthError::DeliveryFailed(_)
        )
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::ProviderUnavailable(_)
                | AuthError::DeliveryFailed(_)
                | AuthError::RateLimited { .. }
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidCredential(_) | AuthError::Unauthorized(_) => 401,
            AuthError::Conflict(_) => 409,
            AuthError::NotFound(_) => 404,
            AuthError::RateLimited { .. } => 429,
            AuthError::Validation(_) => 400,
            AuthError::ProviderUnavailable(_) | AuthError::DeliveryFailed(_) => 503,
            AuthError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            AuthError::Unauthorized(_) => "UNAUTHORIZED",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::RateLimited { .. } => "RATE_LIMITED",
            AuthError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            AuthError::DeliveryFailed(_) => "DELIVERY_FAILED",
            AuthError::Validation(_) => "VALIDATION_FAILED",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to a caller. Internal detail is withheld.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<TokenRejection> for AuthError {
    fn from(reason: TokenRejection) -> Self {
        AuthError::InvalidCredential(format!("invalid token ({})", reason))
    }
}

impl From<CacheError> for AuthError {
    fn from(e: CacheError) -> Self {
        AuthError::internal("cache store", e)
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::internal("account store", e)
    }
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::InvalidConfig(_) => AuthError::internal("provider configuration", e),
            other => {
                tracing::warn!(error = %other, "Provider call failed");
                AuthError::ProviderUnavailable(other.to_string())
            }
        }
    }
}
