//! Identity federation validator
//!
//! Verifies an externally issued identity token with the identity provider
//! and normalizes its claims. No side effects.

use crate::error::{AuthError, AuthResult};
use crate::fingerprint::fingerprint;
use crate::providers::IdentityProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketing_accounts::FederationProvider;
use ticketing_providers::DecodedIdToken;
use tracing::{debug, warn};

/// Normalized claims of a verified federated identity token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    /// Subject id at the identity provider
    pub subject: String,

    /// Email, if the provider shared one
    pub email: Option<String>,

    /// Whether the provider vouches for the email
    pub email_verified: bool,

    /// Display name
    pub display_name: Option<String>,

    /// Avatar URL
    pub picture: Option<String>,

    /// Phone number, if present
    pub phone_number: Option<String>,

    /// Raw provider hint (`google.com`, `facebook.com`, ... or `federated`)
    pub provider_hint: String,

    /// Provider derived from the hint
    pub provider: FederationProvider,

    /// When the user authenticated at the provider (Unix timestamp)
    pub auth_time: Option<i64>,

    /// Token issuer
    pub issuer: Option<String>,
}

impl From<DecodedIdToken> for FederatedIdentity {
    fn from(decoded: DecodedIdToken) -> Self {
        let provider_hint = decoded.provider_hint().to_string();
        let provider = FederationProvider::from_sign_in_hint(&provider_hint);

        Self {
            subject: decoded.uid,
            email: decoded.email,
            email_verified: decoded.email_verified,
            display_name: decoded.name,
            picture: decoded.picture,
            phone_number: decoded.phone_number,
            provider_hint,
            provider,
            auth_time: decoded.auth_time,
            issuer: decoded.iss,
        }
    }
}

/// Validates federated identity tokens against the identity provider.
#[derive(Clone)]
pub struct FederationValidator {
    identity: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for FederationValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationValidator").finish()
    }
}

impl FederationValidator {
    /// Create a validator backed by `identity`.
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    /// Verify `raw_token` and return its normalized claims.
    ///
    /// A provider 4xx means the token is bad ([`AuthError::InvalidCredential`]);
    /// any other provider failure is [`AuthError::ProviderUnavailable`].
    pub async fn validate(&self, raw_token: &str) -> AuthResult<FederatedIdentity> {
        let raw_token = raw_token.trim();
        if raw_token.is_empty() {
            return Err(AuthError::Validation("identity token is required".to_string()));
        }

        let decoded = match self.identity.verify_token(raw_token).await {
            Ok(decoded) => decoded,
            Err(e) if e.is_rejection() => {
                warn!(token = %fingerprint(raw_token), error = %e, "Federated token rejected");
                return Err(AuthError::InvalidCredential(
                    "federated identity token is invalid or expired".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let identity = FederatedIdentity::from(decoded);
        debug!(
            subject = %identity.subject,
            provider = %identity.provider,
            "Federated token validated"
        );
        Ok(identity)
    }
}
