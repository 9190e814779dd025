//! Messaging provider client.
//!
//! Sends template messages (OTP codes) to phone numbers. The provider's
//! access token expires, so the client keeps it in process and refreshes it
//! through the OAuth endpoint before a dispatch when it is missing or stale.
//! Each refresh rotates the refresh token as well.

use crate::config::{join_url, MessagingConfig};
use crate::error::{build_client, handle_response, ProviderError, ProviderResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

const SERVICE: &str = "messaging";

/// Tokens are refreshed this long before the provider's stated expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Country code substituted for a leading trunk `0`.
const COUNTRY_CODE: &str = "84";

/// Convert a local phone number to the international form the provider expects.
///
/// A leading `+` is dropped and a leading `0` becomes the country code.
///
/// # Examples
///
/// ```
/// use ticketing_providers::messaging::to_international;
///
/// assert_eq!(to_international("0901234567"), "84901234567");
/// assert_eq!(to_international("+84901234567"), "84901234567");
/// ```
pub fn to_international(phone: &str) -> String {
    let phone = phone.trim_start_matches('+');
    match phone.strip_prefix('0') {
        Some(rest) => format!("{}{}", COUNTRY_CODE, rest),
        None => phone.to_string(),
    }
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_SKEW < self.expires_at
    }
}

#[derive(Debug, Default)]
struct TokenState {
    access: Option<AccessToken>,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<i64>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    /// The provider sends `expires_in` as either a number or a numeric string.
    fn expires_in(&self) -> Option<u64> {
        match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Template message request body.
#[derive(Debug, Serialize)]
struct TemplateMessage<'a> {
    phone: String,
    template_id: &'a str,
    template_data: serde_json::Value,
    tracking_id: String,
}

#[derive(Debug, Deserialize)]
struct DispatchResponse {
    #[serde(default)]
    error: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<DispatchData>,
}

#[derive(Debug, Deserialize)]
struct DispatchData {
    #[serde(default)]
    msg_id: Option<String>,
}

/// Receipt for an accepted template message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Provider message id, when reported.
    pub message_id: Option<String>,

    /// Tracking id sent with the message.
    pub tracking_id: String,
}

/// Messaging provider client.
pub struct MessagingClient {
    /// HTTP client instance.
    client: Client,

    /// Endpoints and application credentials.
    config: MessagingConfig,

    /// Cached access token and current refresh token.
    ///
    /// Held across a refresh so concurrent dispatches never spend the same
    /// refresh token twice.
    tokens: Mutex<TokenState>,
}

impl std::fmt::Debug for MessagingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingClient")
            .field("api_url", &self.config.api_url)
            .field("oauth_url", &self.config.oauth_url)
            .finish()
    }
}

impl MessagingClient {
    /// Create a new messaging client.
    pub fn new(config: MessagingConfig, timeout: Duration) -> ProviderResult<Self> {
        let tokens = TokenState {
            access: None,
            refresh_token: config.refresh_token.clone(),
        };

        Ok(Self {
            client: build_client(timeout)?,
            config,
            tokens: Mutex::new(tokens),
        })
    }

    /// Return a usable access token, refreshing it when missing or stale.
    pub async fn access_token(&self) -> ProviderResult<String> {
        let mut tokens = self.tokens.lock().await;

        if let Some(access) = tokens.access.as_ref() {
            if access.is_fresh(Instant::now()) {
                return Ok(access.value.clone());
            }
        }

        let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("messaging refresh token not configured".to_string())
        })?;

        let refreshed = self.refresh(&refresh_token).await?;
        let value = refreshed.value.clone();
        tokens.access = Some(refreshed.access);
        if let Some(rotated) = refreshed.rotated_refresh_token {
            tokens.refresh_token = Some(rotated);
        }

        Ok(value)
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let app_id = self.config.app_id.as_deref().ok_or_else(|| {
            ProviderError::InvalidConfig("messaging app id not configured".to_string())
        })?;
        let app_secret = self.config.app_secret.as_deref().ok_or_else(|| {
            ProviderError::InvalidConfig("messaging app secret not configured".to_string())
        })?;

        debug!("Refreshing messaging access token");

        let url = join_url(&self.config.oauth_url, "/v4/oa/access_token");
        let response = self
            .client
            .post(&url)
            .header("secret_key", app_secret)
            .form(&[
                ("app_id", app_id),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;

        let body: TokenResponse = handle_response(SERVICE, response).await?;

        if let Some(code) = body.error.filter(|code| *code != 0) {
            let message = body
                .error_description
                .unwrap_or_else(|| "token refresh refused".to_string());
            error!(code, "Messaging token refresh refused: {}", message);
            return Err(ProviderError::Refused {
                service: SERVICE,
                code,
                message,
            });
        }

        let expires_in = body.expires_in().ok_or_else(|| ProviderError::InvalidResponse {
            service: SERVICE,
            message: "missing expires_in".to_string(),
        })?;
        let value = body.access_token.ok_or_else(|| ProviderError::InvalidResponse {
            service: SERVICE,
            message: "missing access_token".to_string(),
        })?;

        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(expires_in))
            .ok_or_else(|| ProviderError::InvalidResponse {
                service: SERVICE,
                message: format!("expires_in out of range: {}", expires_in),
            })?;

        info!(expires_in, "Messaging access token refreshed");

        Ok(RefreshedToken {
            value: value.clone(),
            access: AccessToken { value, expires_at },
            rotated_refresh_token: body.refresh_token,
        })
    }

    /// Send a template message.
    ///
    /// A JSON body with a negative `error` code is a failure even when the
    /// HTTP status is 200.
    #[instrument(skip(self, template_data))]
    pub async fn send_template(
        &self,
        phone: &str,
        template_id: &str,
        template_data: serde_json::Value,
    ) -> ProviderResult<DispatchReceipt> {
        let access_token = self.access_token().await?;
        let tracking_id = uuid::Uuid::now_v7().to_string();

        let url = join_url(&self.config.api_url, "/message/template");
        let body = TemplateMessage {
            phone: to_international(phone),
            template_id,
            template_data,
            tracking_id: tracking_id.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("access_token", access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;

        let reply: DispatchResponse = handle_response(SERVICE, response).await?;

        if reply.error < 0 {
            let message = reply
                .message
                .unwrap_or_else(|| "message dispatch refused".to_string());
            warn!(code = reply.error, "Messaging provider refused dispatch: {}", message);
            return Err(ProviderError::Refused {
                service: SERVICE,
                code: reply.error,
                message,
            });
        }

        debug!(tracking_id = %tracking_id, "Template message accepted");

        Ok(DispatchReceipt {
            message_id: reply.data.and_then(|d| d.msg_id),
            tracking_id,
        })
    }

    /// Send an OTP code through the given template.
    pub async fn send_otp(
        &self,
        phone: &str,
        template_id: &str,
        code: &str,
    ) -> ProviderResult<DispatchReceipt> {
        self.send_template(phone, template_id, serde_json::json!({ "otp": code }))
            .await
    }
}

struct RefreshedToken {
    value: String,
    access: AccessToken,
    rotated_refresh_token: Option<String>,
}
