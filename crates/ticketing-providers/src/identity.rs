//! Identity provider client.
//!
//! Verifies externally issued identity tokens and revokes a user's sessions
//! at the provider. One client is shared per process; see [`initialize`].

use crate::config::{Endpoint, ProviderConfig};
use crate::error::{build_client, handle_response, check_status, ProviderError, ProviderResult};
use once_cell::sync::OnceCell;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const SERVICE: &str = "identity";

/// Process-wide identity client.
static IDENTITY_CLIENT: OnceCell<Arc<IdentityClient>> = OnceCell::new();

/// Initialize the process-wide identity client.
///
/// The first successful call builds the client from `config`; every later call
/// returns the same handle and ignores its argument. Inject the returned handle
/// into the components that need it.
pub fn initialize(config: &ProviderConfig) -> ProviderResult<Arc<IdentityClient>> {
    IDENTITY_CLIENT
        .get_or_try_init(|| {
            let client = IdentityClient::new(config.identity.clone(), config.timeout())?;
            info!(base_url = %config.identity.base_url, "Identity client initialized");
            Ok(Arc::new(client))
        })
        .map(Arc::clone)
}

/// Sign-in metadata attached to a decoded token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignInInfo {
    /// Provider used for this sign-in, e.g. `google.com`.
    #[serde(default)]
    pub sign_in_provider: Option<String>,

    /// Linked identities keyed by provider id.
    #[serde(default)]
    pub identities: HashMap<String, serde_json::Value>,
}

/// User record decoded from a verified identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedIdToken {
    /// Subject id at the provider.
    pub uid: String,

    /// Email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Whether the provider verified the email.
    #[serde(default)]
    pub email_verified: bool,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,

    /// Phone number, when the identity carries one.
    #[serde(default)]
    pub phone_number: Option<String>,

    /// Unix time of the original authentication.
    #[serde(default)]
    pub auth_time: Option<i64>,

    /// Token issuer.
    #[serde(default)]
    pub iss: Option<String>,

    /// Sign-in metadata.
    #[serde(default, rename = "firebase")]
    pub sign_in: SignInInfo,
}

impl DecodedIdToken {
    /// Provider hint for this sign-in.
    ///
    /// Uses the explicit sign-in provider when present, then the linked
    /// identities (`google.com` before `facebook.com`), else `federated`.
    pub fn provider_hint(&self) -> &str {
        if let Some(provider) = self.sign_in.sign_in_provider.as_deref() {
            return provider;
        }
        for candidate in ["google.com", "facebook.com"] {
            if self.sign_in.identities.contains_key(candidate) {
                return candidate;
            }
        }
        "federated"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyTokenRequest<'a> {
    id_token: &'a str,
}

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityClient {
    /// HTTP client instance.
    client: Client,

    /// Service endpoint configuration.
    endpoint: Endpoint,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.endpoint.base_url)
            .finish()
    }
}

impl IdentityClient {
    /// Create a new identity client.
    pub fn new(endpoint: Endpoint, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.endpoint.api_key {
            Some(ref api_key) => request.header("Authorization", format!("Bearer {}", api_key)),
            None => request,
        }
    }

    /// Verify a raw identity token and return the decoded user record.
    ///
    /// A 4xx answer means the token is invalid or expired.
    #[instrument(skip(self, id_token))]
    pub async fn verify_token(&self, id_token: &str) -> ProviderResult<DecodedIdToken> {
        let url = self.endpoint.url("/v1/tokens:verify");
        let request = self
            .authorize(self.client.post(&url))
            .json(&VerifyTokenRequest { id_token });

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;
        let decoded: DecodedIdToken = handle_response(SERVICE, response).await?;

        debug!(uid = %decoded.uid, "Identity token verified");
        Ok(decoded)
    }

    /// Revoke every session the provider holds for `uid`.
    #[instrument(skip(self))]
    pub async fn revoke_sessions(&self, uid: &str) -> ProviderResult<()> {
        let url = self.revoke_url(uid)?;

        let response = self
            .authorize(self.client.post(url))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;
        check_status(SERVICE, response).await?;

        info!(uid = %uid, "Identity provider sessions revoked");
        Ok(())
    }

    /// Session revocation URL with `uid` escaped as a single path segment.
    fn revoke_url(&self, uid: &str) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.endpoint.url("/v1/accounts"))
            .map_err(|e| ProviderError::InvalidConfig(format!("invalid identity url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidConfig("identity url cannot take a path".to_string()))?
            .pop_if_empty()
            .push(&format!("{}:revokeSessions", uid));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(json: serde_json::Value) -> DecodedIdToken {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_provider_hint_prefers_sign_in_provider() {
        let token = decoded(serde_json::json!({
            "uid": "uid-abc",
            "firebase": {
                "sign_in_provider": "facebook.com",
                "identities": { "google.com": ["1"] }
            }
        }));
        assert_eq!(token.provider_hint(), "facebook.com");
    }

    #[test]
    fn test_provider_hint_from_identities() {
        let token = decoded(serde_json::json!({
            "uid": "uid-abc",
            "firebase": { "identities": { "facebook.com": ["2"], "google.com": ["1"] } }
        }));
        assert_eq!(token.provider_hint(), "google.com");
    }

    #[test]
    fn test_provider_hint_defaults_to_federated() {
        let token = decoded(serde_json::json!({ "uid": "uid-abc" }));
        assert_eq!(token.provider_hint(), "federated");
        assert!(!token.email_verified);
        assert!(token.email.is_none());
    }

    #[test]
    fn test_revoke_url_escapes_uid() {
        let client = IdentityClient::new(
            ProviderConfig::default().identity,
            Duration::from_secs(5),
        )
        .unwrap();

        let plain = client.revoke_url("uid-abc").unwrap();
        assert_eq!(plain.path(), "/v1/accounts/uid-abc:revokeSessions");

        let hostile = client.revoke_url("a/b?c#d").unwrap();
        assert_eq!(hostile.path(), "/v1/accounts/a%2Fb%3Fc%23d:revokeSessions");
        assert!(hostile.query().is_none());
        assert!(hostile.fragment().is_none());
    }

    #[test]
    fn test_initialize_returns_shared_handle() {
        let config = ProviderConfig::default();
        let first = initialize(&config).unwrap();

        let mut other = ProviderConfig::default();
        other.identity.base_url = "http://elsewhere:1".to_string();
        let second = initialize(&other).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.endpoint.base_url, config.identity.base_url);
    }
}
