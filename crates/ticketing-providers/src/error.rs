//! Provider error types.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Errors returned by provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a 4xx status.
    #[error("{service} rejected the request ({status}): {message}")]
    Rejected {
        /// Provider name.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Error message from the provider.
        message: String,
    },

    /// The provider answered 2xx but reported an application-level error code.
    #[error("{service} refused the request (code {code}): {message}")]
    Refused {
        /// Provider name.
        service: &'static str,
        /// Provider error code.
        code: i64,
        /// Error message from the provider.
        message: String,
    },

    /// 5xx status, network failure or timeout.
    #[error("{service} unavailable: {message}")]
    Unavailable {
        /// Provider name.
        service: &'static str,
        /// Failure detail.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Invalid {service} response: {message}")]
    InvalidResponse {
        /// Provider name.
        service: &'static str,
        /// Decode error.
        message: String,
    },

    /// Client is missing a credential or could not be built.
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    /// Whether the provider judged the request itself invalid.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Refused { .. })
    }

    /// Whether the same request might succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// HTTP status reported by the provider, if it answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a transport-level reqwest error.
    pub(crate) fn from_transport(service: &'static str, e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("request timed out: {}", e)
        } else {
            e.to_string()
        };
        Self::Unavailable { service, message }
    }
}

/// Check the status of a provider response and pass successful ones through.
///
/// 4xx becomes [`ProviderError::Rejected`], anything else non-2xx becomes
/// [`ProviderError::Unavailable`].
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    warn!(service, status = status.as_u16(), "Provider API error: {}", message);

    if status.is_client_error() {
        Err(ProviderError::Rejected {
            service,
            status: status.as_u16(),
            message,
        })
    } else {
        Err(ProviderError::Unavailable {
            service,
            message: format!("HTTP {}: {}", status.as_u16(), message),
        })
    }
}

/// Check the status and decode a JSON body.
pub(crate) async fn handle_response<T>(
    service: &'static str,
    response: reqwest::Response,
) -> ProviderResult<T>
where
    T: DeserializeOwned,
{
    let response = check_status(service, response).await?;
    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse {
            service,
            message: e.to_string(),
        })
}

/// Build the shared HTTP client with a bounded timeout.
pub(crate) fn build_client(timeout: std::time::Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::InvalidConfig(format!("failed to build HTTP client: {}", e)))
}
