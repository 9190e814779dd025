//! JWT token minting and verification
//!
//! Access and refresh tokens are HS256-signed with separate secrets. Minting
//! is stateless: persisting the refresh token and whitelisting the access
//! token are left to the caller.

use crate::claims::{TokenClaims, TokenPurpose};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult, TokenRejection};
use crate::fingerprint::fingerprint;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use ticketing_accounts::Account;
use tracing::warn;

/// Token pair containing access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,

    /// Refresh token (long-lived)
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Access token expiration in seconds
    pub expires_in: i64,

    /// Refresh token expiration in seconds
    pub refresh_expires_in: i64,
}

impl TokenPair {
    /// Create a new token pair.
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        refresh_expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_expires_in,
        }
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Mints and verifies platform token pairs.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_key", &"[REDACTED]")
            .field("refresh_key", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenService {
    /// Create a token service from configuration.
    ///
    /// Fails when the configuration is unusable (short or shared secrets,
    /// zero lifetimes).
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::internal("token service configuration", e))?;

        Ok(Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            issuer: config.issuer.clone(),
            access_ttl: chrono::Duration::seconds(config.access_ttl_secs as i64),
            refresh_ttl: chrono::Duration::seconds(config.refresh_ttl_secs as i64),
        })
    }

    fn keys(&self, purpose: TokenPurpose) -> &KeyPair {
        match purpose {
            TokenPurpose::Access => &self.access,
            TokenPurpose::Refresh => &self.refresh,
        }
    }

    fn lifetime(&self, purpose: TokenPurpose) -> chrono::Duration {
        match purpose {
            TokenPurpose::Access => self.access_ttl,
            TokenPurpose::Refresh => self.refresh_ttl,
        }
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> chrono::Duration {
        self.access_ttl
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> chrono::Duration {
        self.refresh_ttl
    }

    /// Mint an access and refresh token for `account`.
    pub fn mint(&self, account: &Account) -> AuthResult<TokenPair> {
        let access = self.issue(account, TokenPurpose::Access)?;
        let refresh = self.issue(account, TokenPurpose::Refresh)?;

        Ok(TokenPair::new(
            access,
            refresh,
            self.access_ttl.num_seconds(),
            self.refresh_ttl.num_seconds(),
        ))
    }

    /// Mint a single token of the given purpose.
    pub fn issue(&self, account: &Account, purpose: TokenPurpose) -> AuthResult<String> {
        let claims =
            TokenClaims::for_account(account, purpose, &self.issuer, self.lifetime(purpose));
        self.sign(&claims)
    }

    fn sign(&self, claims: &TokenClaims) -> AuthResult<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(claims.purpose).encoding,
        )
        .map_err(|e| AuthError::internal("token encoding", e))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }

    /// Verify a token for the expected purpose.
    ///
    /// Every rejection surfaces as [`AuthError::InvalidCredential`]; the
    /// specific reason is logged.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> AuthResult<TokenClaims> {
        self.verify_detailed(token, expected).map_err(|reason| {
            warn!(
                purpose = %expected,
                reason = %reason,
                token = %fingerprint(token),
                "Token rejected"
            );
            AuthError::from(reason)
        })
    }

    /// Verify a token, reporting the precise rejection reason.
    pub fn verify_detailed(
        &self,
        token: &str,
        expected: TokenPurpose,
    ) -> Result<TokenClaims, TokenRejection> {
        let validation = self.validation();

        let claims = match decode::<TokenClaims>(token, &self.keys(expected).decoding, &validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                let reason = rejection_reason(e.kind());
                // A token that verifies under the other key was minted for the other purpose.
                if reason == TokenRejection::BadSignature
                    && decode::<TokenClaims>(
                        token,
                        &self.keys(expected.other()).decoding,
                        &validation,
                    )
                    .is_ok()
                {
                    return Err(TokenRejection::PurposeMismatch);
                }
                return Err(reason);
            }
        };

        if claims.purpose != expected {
            return Err(TokenRejection::PurposeMismatch);
        }
        if claims.account_id().is_none() {
            return Err(TokenRejection::InvalidClaims);
        }

        Ok(claims)
    }
}

fn rejection_reason(kind: &JwtErrorKind) -> TokenRejection {
    match kind {
        JwtErrorKind::ExpiredSignature => TokenRejection::Expired,
        JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
            TokenRejection::BadSignature
        }
        JwtErrorKind::InvalidIssuer
        | JwtErrorKind::MissingRequiredClaim(_)
        | JwtErrorKind::ImmatureSignature
        | JwtErrorKind::Json(_) => TokenRejection::InvalidClaims,
        _ => TokenRejection::Malformed,
    }
}
