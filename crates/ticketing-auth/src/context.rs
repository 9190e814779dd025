//! Authenticated identity context.
//!
//! Produced once by token validation and passed explicitly to handlers and
//! to [`AuthService::sign_out`](crate::AuthService::sign_out), so nothing
//! downstream has to re-validate the token.

use crate::claims::{TokenClaims, TokenPurpose};
use serde::{Deserialize, Serialize};
use ticketing_accounts::{FederationProvider, Role};
use uuid::Uuid;

/// Identity established by a validated platform token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Internal account id
    pub account_id: Uuid,

    /// Subject id at the identity provider (absent for phone accounts)
    pub subject: Option<String>,

    /// Account email
    pub email: Option<String>,

    /// Role carried by the token
    pub role: Option<Role>,

    /// Provider carried by the token
    pub provider: Option<FederationProvider>,

    /// Purpose of the validated token
    pub purpose: TokenPurpose,
}

impl AuthContext {
    /// Build a context from verified claims.
    ///
    /// Returns `None` when the subject claim is not an account id.
    pub fn from_claims(claims: &TokenClaims) -> Option<Self> {
        Some(Self {
            account_id: claims.account_id()?,
            subject: claims.uid.clone(),
            email: claims.email.clone(),
            role: claims.role,
            provider: claims.provider,
            purpose: claims.purpose,
        })
    }

    /// Whether the context carries the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}
