//! Platform token claims
//!
//! Access and refresh tokens share one claims shape. The `type` claim
//! records the purpose; access tokens additionally carry role and provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketing_accounts::{Account, FederationProvider, Role};
use uuid::Uuid;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Short-lived bearer credential for protected resources
    Access,
    /// Long-lived credential exchanged for a new pair
    Refresh,
}

impl TokenPurpose {
    /// Get string representation of the purpose.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    /// The other purpose.
    pub fn other(&self) -> Self {
        match self {
            Self::Access => Self::Refresh,
            Self::Refresh => Self::Access,
        }
    }
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by platform access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Internal account id
    pub sub: String,

    /// Subject id at the external identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Account email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Account role (access tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Federation provider (access tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<FederationProvider>,

    /// Token purpose
    #[serde(rename = "type")]
    pub purpose: TokenPurpose,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique per minted token)
    pub jti: String,
}

impl TokenClaims {
    /// Build claims for `account` with the given purpose and lifetime.
    pub fn for_account(
        account: &Account,
        purpose: TokenPurpose,
        issuer: &str,
        lifetime: chrono::Duration,
    ) -> Self {
        let now = Utc::now();
        let (role, provider) = match purpose {
            TokenPurpose::Access => (Some(account.role), Some(account.provider)),
            TokenPurpose::Refresh => (None, None),
        };

        Self {
            sub: account.id.to_string(),
            uid: account.subject.clone(),
            email: account.email.clone(),
            role,
            provider,
            purpose,
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: Uuid::now_v7().to_string(),
        }
    }

    /// Get the account id as UUID.
    pub fn account_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Get issued-at as DateTime.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}
