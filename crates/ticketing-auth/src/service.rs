//! Account resolution service
//!
//! Orchestrates every sign-in path: a validated federated identity or an
//! OTP-confirmed phone number is mapped to an account (provisioned on first
//! use), a token pair is minted, the refresh token is persisted and the
//! access token is whitelisted.
//!
//! External profile provisioning always runs before the local insert, so a
//! provisioning failure never leaves a local account behind.

use crate::claims::{TokenClaims, TokenPurpose};
use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::error::{AuthError, AuthResult};
use crate::federation::{FederatedIdentity, FederationValidator};
use crate::jwt::{TokenPair, TokenService};
use crate::otp::{validate_phone, CodeGenerator, OtpEngine, OtpIssued, OtpPolicy};
use crate::providers::{IdentityProvider, OtpDispatcher, ProfileProvisioner, TemplateOtpDispatcher};
use crate::registry::SessionRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use ticketing_accounts::{
    Account, AccountStore, FederationProvider, IdentityOrigin, Role, StoreError,
};
use ticketing_cache::CacheStore;
use ticketing_providers::{IdentityClient, MessagingClient, NewProfile, ProfileClient};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Internal account id
    pub id: Uuid,
    /// Subject id at the identity provider
    pub subject: Option<String>,
    /// Email
    pub email: Option<String>,
    /// Phone number
    pub phone_number: Option<String>,
    /// Whether the email is verified
    pub email_verified: bool,
    /// Whether the phone number is verified
    pub phone_verified: bool,
    /// Role
    pub role: Role,
    /// How the account authenticates
    pub origin: IdentityOrigin,
    /// Federation provider
    pub provider: FederationProvider,
    /// Last successful sign-in
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            subject: account.subject.clone(),
            email: account.email.clone(),
            phone_number: account.phone_number.clone(),
            email_verified: account.email_verified,
            phone_verified: account.phone_verified,
            role: account.role,
            origin: account.origin,
            provider: account.provider,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Outcome of a successful sign-in or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignIn {
    /// Freshly minted token pair
    pub tokens: TokenPair,
    /// The signed-in account
    pub account: AccountSummary,
    /// Whether the account was provisioned by this call
    pub is_new_account: bool,
}

/// Result of validating a platform token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenValidation {
    /// Internal account id
    pub account_id: Uuid,
    /// Subject id at the identity provider
    pub subject: Option<String>,
    /// Email
    pub email: Option<String>,
    /// Token purpose
    pub purpose: TokenPurpose,
    /// Whether the account still exists
    pub account_exists: bool,
    /// Current role (from the account when it exists, else from the token)
    pub role: Option<Role>,
    /// Federation provider
    pub provider: Option<FederationProvider>,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
    /// Context for downstream handlers
    pub context: AuthContext,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    cache: Arc<dyn CacheStore>,
    accounts: Arc<dyn AccountStore>,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileProvisioner>,
    tokens: Arc<TokenService>,
    registry: SessionRegistry,
    otp: OtpEngine,
    federation: FederationValidator,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("registry", &self.registry)
            .field("otp", &self.otp)
            .finish()
    }
}

impl AuthService {
    /// Create a service from its collaborators.
    pub fn new(
        config: AuthConfig,
        cache: Arc<dyn CacheStore>,
        accounts: Arc<dyn AccountStore>,
        identity: Arc<dyn IdentityProvider>,
        dispatcher: Arc<dyn OtpDispatcher>,
        profiles: Arc<dyn ProfileProvisioner>,
    ) -> AuthResult<Self> {
        let tokens = Arc::new(TokenService::new(&config)?);
        let registry = SessionRegistry::new(cache.clone(), config.access_ttl());
        let policy = OtpPolicy {
            ttl: config.otp_ttl(),
            max_requests: config.otp_max_requests,
            window: config.otp_window(),
        };
        let otp = OtpEngine::new(cache.clone(), dispatcher, policy);
        let federation = FederationValidator::new(identity.clone());

        info!(issuer = %config.issuer, "Auth service initialized");

        Ok(Self {
            cache,
            accounts,
            identity,
            profiles,
            tokens,
            registry,
            otp,
            federation,
        })
    }

    /// Create a service wired to the HTTP provider clients.
    ///
    /// OTP codes are sent through the configured messaging template.
    pub fn with_clients(
        config: AuthConfig,
        cache: Arc<dyn CacheStore>,
        accounts: Arc<dyn AccountStore>,
        identity: Arc<IdentityClient>,
        messaging: Arc<MessagingClient>,
        profiles: Arc<ProfileClient>,
    ) -> AuthResult<Self> {
        let dispatcher = Arc::new(TemplateOtpDispatcher::new(
            messaging,
            config.otp_template_id.clone(),
        ));
        Self::new(config, cache, accounts, identity, dispatcher, profiles)
    }

    /// Replace the OTP code generator.
    pub fn with_code_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.otp = self.otp.with_generator(generator);
        self
    }

    /// Token service used for minting and verification.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Session registry backing access-token validation.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Check that the cache store is reachable.
    pub async fn health_check(&self) -> AuthResult<()> {
        self.cache.ping().await?;
        Ok(())
    }

    /// Register a new account from a federated identity token.
    ///
    /// Fails with [`AuthError::Conflict`] when the subject already has an
    /// account. The profile is provisioned first; if that fails nothing is
    /// stored locally.
    pub async fn sign_up(&self, id_token: &str) -> AuthResult<AccountSummary> {
        let identity = self.federation.validate(id_token).await?;

        if self
            .accounts
            .find_by_subject(&identity.subject)
            .await?
            .is_some()
        {
            info!(subject = %identity.subject, "Sign-up refused: account exists");
            return Err(AuthError::Conflict(
                "an account already exists for this identity".to_string(),
            ));
        }

        let account = new_federated_account(&identity);

        self.provision_profile(NewProfile {
            id: account.id.to_string(),
            name: display_name(&identity),
            picture: identity.picture.clone(),
        })
        .await?;

        self.insert_provisioned(&account).await?;

        info!(
            account_id = %account.id,
            subject = %identity.subject,
            provider = %account.provider,
            "Account signed up"
        );
        Ok(AccountSummary::from(&account))
    }

    /// Sign in with a federated identity token.
    ///
    /// The account is looked up by subject and provider together; a subject
    /// registered through another provider is [`AuthError::NotFound`].
    pub async fn sign_in_federated(&self, id_token: &str) -> AuthResult<SignIn> {
        let identity = self.federation.validate(id_token).await?;

        let mut account = self
            .accounts
            .find_by_subject_and_provider(&identity.subject, identity.provider)
            .await?
            .ok_or_else(|| {
                info!(
                    subject = %identity.subject,
                    provider = %identity.provider,
                    "Federated sign-in for unknown account"
                );
                AuthError::NotFound("no account for this identity; sign up first".to_string())
            })?;

        if identity.email_verified && identity.email == account.email {
            account.email_verified = true;
        }

        self.start_session(account, Some(id_token.trim().to_string()), false)
            .await
    }

    /// Send an OTP to `phone`.
    pub async fn request_otp(&self, phone: &str) -> AuthResult<OtpIssued> {
        self.otp.request_otp(phone).await
    }

    /// Check an OTP. A successful check consumes the code.
    pub async fn verify_otp(&self, phone: &str, code: &str) -> AuthResult<bool> {
        self.otp.verify_otp(phone, code).await
    }

    /// Sign in a phone number whose OTP has already been verified.
    ///
    /// A first sign-in provisions a minimal account and its profile; if the
    /// profile cannot be created the sign-in fails and nothing is stored.
    /// A number held by a federated account is [`AuthError::InvalidCredential`];
    /// that account signs in through its identity provider only.
    pub async fn sign_in_otp(&self, phone: &str) -> AuthResult<SignIn> {
        validate_phone(phone)?;

        if let Some(account) = self.accounts.find_by_phone(phone).await? {
            let account = phone_account(account)?;
            return self.start_session(account, None, false).await;
        }

        let account = Account::phone(phone);
        self.provision_profile(NewProfile {
            id: account.id.to_string(),
            name: format!("Zalo User-{}", phone),
            picture: None,
        })
        .await?;

        match self.insert_provisioned(&account).await {
            Ok(()) => {
                info!(account_id = %account.id, phone = %phone, "Phone account provisioned");
                self.start_session(account, None, true).await
            }
            Err(AuthError::Conflict(_)) => {
                // Lost a race with a concurrent first sign-in for this number.
                let existing = self.accounts.find_by_phone(phone).await?.ok_or_else(|| {
                    AuthError::internal("phone sign-in", "account vanished after conflict")
                })?;
                self.start_session(phone_account(existing)?, None, false).await
            }
            Err(e) => Err(e),
        }
    }

    /// Verify `code` for `phone` and sign in on success.
    pub async fn sign_in_with_code(&self, phone: &str, code: &str) -> AuthResult<SignIn> {
        if !self.verify_otp(phone, code).await? {
            return Err(AuthError::InvalidCredential(
                "OTP is invalid or expired".to_string(),
            ));
        }
        self.sign_in_otp(phone).await
    }

    /// Sign out the account behind `context`.
    ///
    /// The whitelist entry is revoked first and unconditionally. Revoking
    /// the federated session at the identity provider is best effort.
    pub async fn sign_out(&self, context: &AuthContext) -> AuthResult<()> {
        self.registry.revoke(context.account_id).await?;

        let mut account = self
            .resolve_account(context.subject.as_deref(), context.account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("account not found".to_string()))?;

        if account.is_federated() {
            if let Some(subject) = account.subject.as_deref() {
                if let Err(e) = self.identity.revoke_sessions(subject).await {
                    warn!(
                        account_id = %account.id,
                        error = %e,
                        "Failed to revoke identity provider sessions"
                    );
                }
            }
        }

        account.clear_tokens();
        self.accounts.update(&account).await?;

        info!(account_id = %account.id, "Account signed out");
        Ok(())
    }

    /// Validate a platform token for the given purpose.
    ///
    /// Access tokens must also be the whitelisted token for the account.
    /// Refresh tokens must match the refresh token stored on the account.
    pub async fn validate_token(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> AuthResult<TokenValidation> {
        let claims = self.tokens.verify(token, purpose)?;
        let context = context_from(&claims)?;

        let account = match purpose {
            TokenPurpose::Access => {
                if !self.registry.is_valid(context.account_id, token).await? {
                    warn!(account_id = %context.account_id, "Access token is not whitelisted");
                    return Err(AuthError::Unauthorized(
                        "access token has been revoked or superseded".to_string(),
                    ));
                }
                self.resolve_account(context.subject.as_deref(), context.account_id)
                    .await?
            }
            TokenPurpose::Refresh => {
                let account = self
                    .accounts
                    .find_by_id_and_refresh_token(context.account_id, token)
                    .await?;
                match account {
                    Some(account) if subject_matches(&account, context.subject.as_deref()) => {
                        Some(account)
                    }
                    _ => {
                        warn!(account_id = %context.account_id, "Refresh token is not current");
                        return Err(AuthError::Unauthorized(
                            "refresh token is no longer valid".to_string(),
                        ));
                    }
                }
            }
        };

        Ok(TokenValidation {
            account_id: context.account_id,
            subject: claims.uid.clone(),
            email: claims.email.clone(),
            purpose,
            account_exists: account.is_some(),
            role: account.as_ref().map(|a| a.role).or(claims.role),
            provider: account.as_ref().map(|a| a.provider).or(claims.provider),
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
            context,
        })
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The presented token must be the one stored on the account; a
    /// superseded token is [`AuthError::Unauthorized`]. The stored token is
    /// swapped with a conditional write, so concurrent refreshes with the
    /// same token yield at most one new pair.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<SignIn> {
        let claims = self.tokens.verify(refresh_token, TokenPurpose::Refresh)?;
        let context = context_from(&claims)?;

        let mut account = self
            .resolve_account(context.subject.as_deref(), context.account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("account not found".to_string()))?;

        if !account.refresh_token_matches(refresh_token) {
            return Err(superseded_refresh(account.id));
        }

        let tokens = self.tokens.mint(&account)?;
        account.record_sign_in(tokens.refresh_token.clone(), None);
        if !self
            .accounts
            .rotate_refresh_token(&account, refresh_token)
            .await?
        {
            return Err(superseded_refresh(account.id));
        }

        self.open_session(account, tokens, false).await
    }

    /// Mint a pair, persist the refresh token and whitelist the access token.
    async fn start_session(
        &self,
        mut account: Account,
        id_token: Option<String>,
        is_new_account: bool,
    ) -> AuthResult<SignIn> {
        let tokens = self.tokens.mint(&account)?;

        account.record_sign_in(tokens.refresh_token.clone(), id_token);
        self.accounts.update(&account).await?;
        self.open_session(account, tokens, is_new_account).await
    }

    /// Whitelist the access token of a pair already persisted on `account`.
    async fn open_session(
        &self,
        account: Account,
        tokens: TokenPair,
        is_new_account: bool,
    ) -> AuthResult<SignIn> {
        self.registry
            .whitelist(account.id, &tokens.access_token)
            .await?;

        info!(
            account_id = %account.id,
            origin = %account.origin,
            is_new_account,
            "Session started"
        );

        Ok(SignIn {
            tokens,
            account: AccountSummary::from(&account),
            is_new_account,
        })
    }

    /// Find the account a token refers to.
    ///
    /// Uses the subject id when the token carries one, else the account id.
    /// A subject that now belongs to a different account does not resolve.
    async fn resolve_account(
        &self,
        subject: Option<&str>,
        account_id: Uuid,
    ) -> AuthResult<Option<Account>> {
        let account = match subject {
            Some(subject) => self.accounts.find_by_subject(subject).await?,
            None => self.accounts.find_by_id(account_id).await?,
        };
        Ok(account.filter(|a| a.id == account_id))
    }

    async fn provision_profile(&self, profile: NewProfile) -> AuthResult<()> {
        self.profiles.provision(&profile).await.map_err(|e| {
            error!(account_id = %profile.id, error = %e, "Profile provisioning failed");
            AuthError::from(e)
        })?;
        Ok(())
    }

    /// Insert an account whose profile already exists.
    async fn insert_provisioned(&self, account: &Account) -> AuthResult<()> {
        match self.accounts.insert(account).await {
            Ok(()) => Ok(()),
            Err(StoreError::UniqueViolation { field }) => {
                warn!(
                    account_id = %account.id,
                    field = %field,
                    "Local insert conflicted after profile provisioning"
                );
                Err(AuthError::Conflict(format!(
                    "an account with this {} already exists",
                    field
                )))
            }
            Err(e) => {
                error!(
                    account_id = %account.id,
                    error = %e,
                    "Local insert failed after profile provisioning; profile is orphaned"
                );
                Err(e.into())
            }
        }
    }
}

fn context_from(claims: &TokenClaims) -> AuthResult<AuthContext> {
    AuthContext::from_claims(claims)
        .ok_or_else(|| AuthError::InvalidCredential("token subject is not an account id".to_string()))
}

fn superseded_refresh(account_id: Uuid) -> AuthError {
    warn!(account_id = %account_id, "Superseded refresh token presented");
    AuthError::Unauthorized("refresh token is no longer valid".to_string())
}

fn subject_matches(account: &Account, subject: Option<&str>) -> bool {
    subject.map_or(true, |subject| account.subject.as_deref() == Some(subject))
}

/// Accept an account found by phone only if it was created by phone OTP.
fn phone_account(account: Account) -> AuthResult<Account> {
    if account.origin == IdentityOrigin::PhoneOtp {
        return Ok(account);
    }
    warn!(
        account_id = %account.id,
        origin = %account.origin,
        "Phone sign-in refused for an account of another origin"
    );
    Err(AuthError::InvalidCredential(
        "this phone number belongs to an account that signs in with its identity provider"
            .to_string(),
    ))
}

fn new_federated_account(identity: &FederatedIdentity) -> Account {
    let mut account = Account::federated(identity.subject.clone(), identity.provider)
        .with_custom_claims(json!({
            "subject": identity.subject,
            "picture": identity.picture,
            "auth_time": identity.auth_time,
            "iss": identity.issuer,
        }));
    if let Some(email) = &identity.email {
        account = account.with_email(email.clone(), identity.email_verified);
    }
    if let Some(phone) = &identity.phone_number {
        account = account.with_phone_number(phone.clone());
    }
    account
}

fn display_name(identity: &FederatedIdentity) -> String {
    identity
        .display_name
        .clone()
        .or_else(|| identity.email.clone())
        .unwrap_or_else(|| identity.subject.clone())
}
