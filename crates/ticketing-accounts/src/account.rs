//! Account domain models
//!
//! This module provides the internal Account entity that every sign-in path
//! resolves to, along with the flat role tag and the enums recording how an
//! account proves its identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat role tag carried by every account.
///
/// # Examples
///
/// ```
/// use ticketing_accounts::Role;
///
/// assert_eq!(Role::parse("business"), Some(Role::Business));
/// assert_eq!(Role::default().as_str(), "user");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Standard end user
    #[default]
    User,

    /// Business partner (event organizer, venue)
    Business,

    /// Platform administrator
    Admin,
}

impl Role {
    /// Parse role from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "business" => Some(Self::Business),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Business => "business",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an account proves control of its identity.
///
/// The origin decides which validator path may authenticate the account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IdentityOrigin {
    /// External identity provider token
    Federated,

    /// Phone number one-time passcode
    PhoneOtp,
}

impl IdentityOrigin {
    /// Parse origin from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "federated" => Some(Self::Federated),
            "phone_otp" => Some(Self::PhoneOtp),
            _ => None,
        }
    }

    /// Get string representation of the origin.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federated => "federated",
            Self::PhoneOtp => "phone_otp",
        }
    }
}

impl std::fmt::Display for IdentityOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider that vouched for the account's identity.
///
/// # Examples
///
/// ```
/// use ticketing_accounts::FederationProvider;
///
/// assert_eq!(FederationProvider::from_sign_in_hint("google.com"), FederationProvider::Google);
/// assert_eq!(FederationProvider::from_sign_in_hint("federated"), FederationProvider::Local);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FederationProvider {
    /// Google sign-in
    Google,

    /// Facebook sign-in
    Facebook,

    /// Any other federated sign-in method
    Local,

    /// Phone OTP delivered through Zalo
    SmsZalo,
}

impl FederationProvider {
    /// Map the identity provider's sign-in hint (`google.com`, `facebook.com`, ...)
    /// to a provider. Unknown hints, including the generic `federated` tag, map to
    /// [`FederationProvider::Local`].
    pub fn from_sign_in_hint(hint: &str) -> Self {
        match hint {
            "google.com" => Self::Google,
            "facebook.com" => Self::Facebook,
            _ => Self::Local,
        }
    }

    /// Parse provider from its stored string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(Self::Google),
            "facebook" => Some(Self::Facebook),
            "local" => Some(Self::Local),
            "sms_zalo" => Some(Self::SmsZalo),
            _ => None,
        }
    }

    /// Get string representation of the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::Local => "local",
            Self::SmsZalo => "sms_zalo",
        }
    }
}

impl std::fmt::Display for FederationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal identity record.
///
/// An account is created on the first federated sign-up or the first OTP
/// sign-in for a phone number. It is updated on every sign-in and sign-out
/// and is only ever soft-deleted.
///
/// # Examples
///
/// ```
/// use ticketing_accounts::{Account, FederationProvider, IdentityOrigin, Role};
///
/// let account = Account::federated("uid-abc", FederationProvider::Google)
///     .with_email("ana@example.com", true);
/// assert_eq!(account.role, Role::User);
/// assert_eq!(account.origin, IdentityOrigin::Federated);
/// assert!(account.is_federated());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Time-ordered unique identifier (UUID v7)
    pub id: Uuid,

    /// Subject id at the external identity provider
    pub subject: Option<String>,

    /// Email address
    pub email: Option<String>,

    /// Phone number as entered at OTP sign-in
    pub phone_number: Option<String>,

    /// Whether the identity provider verified the email
    pub email_verified: bool,

    /// Whether an OTP confirmed the phone number
    pub phone_verified: bool,

    /// Flat role tag
    pub role: Role,

    /// Which validator path authenticates this account
    pub origin: IdentityOrigin,

    /// Provider that vouched for the identity
    pub provider: FederationProvider,

    /// Opaque provider claims captured at sign-up
    #[serde(default)]
    pub custom_claims: Option<serde_json::Value>,

    /// Last federated identity token presented
    #[serde(skip_serializing)]
    pub id_token: Option<String>,

    /// The single refresh token currently trusted for this account
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,

    /// Last successful sign-in
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    fn blank(origin: IdentityOrigin, provider: FederationProvider) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            subject: None,
            email: None,
            phone_number: None,
            email_verified: false,
            phone_verified: false,
            role: Role::default(),
            origin,
            provider,
            custom_claims: None,
            id_token: None,
            refresh_token: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Creates a new account for a federated identity.
    pub fn federated(subject: impl Into<String>, provider: FederationProvider) -> Self {
        let mut account = Self::blank(IdentityOrigin::Federated, provider);
        account.subject = Some(subject.into());
        account
    }

    /// Creates a minimal account for a phone number confirmed by OTP.
    ///
    /// The account has a verified phone, no email and the default role.
    pub fn phone(phone_number: impl Into<String>) -> Self {
        let mut account = Self::blank(IdentityOrigin::PhoneOtp, FederationProvider::SmsZalo);
        account.phone_number = Some(phone_number.into());
        account.phone_verified = true;
        account
    }

    /// Set the email address and its verification flag.
    pub fn with_email(mut self, email: impl Into<String>, verified: bool) -> Self {
        self.email = Some(email.into());
        self.email_verified = verified;
        self
    }

    /// Set the phone number reported by the identity provider.
    ///
    /// The provider only reports numbers it has confirmed, so the number is
    /// marked verified.
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self.phone_verified = true;
        self
    }

    /// Attach opaque provider claims.
    pub fn with_custom_claims(mut self, claims: serde_json::Value) -> Self {
        self.custom_claims = Some(claims);
        self
    }

    /// Record a successful sign-in.
    ///
    /// Storing the new refresh token supersedes the previous one for refresh
    /// purposes. The identity token is kept only when one was presented.
    pub fn record_sign_in(&mut self, refresh_token: impl Into<String>, id_token: Option<String>) {
        let now = Utc::now();
        self.refresh_token = Some(refresh_token.into());
        if id_token.is_some() {
            self.id_token = id_token;
        }
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Forget the stored refresh and identity tokens (sign-out).
    pub fn clear_tokens(&mut self) {
        self.refresh_token = None;
        self.id_token = None;
        self.updated_at = Utc::now();
    }

    /// Whether the stored refresh token is exactly `token`.
    pub fn refresh_token_matches(&self, token: &str) -> bool {
        self.refresh_token.as_deref() == Some(token)
    }

    /// Check if the account has the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check if the account has the business role.
    pub fn is_business(&self) -> bool {
        self.role == Role::Business
    }

    /// Check if the account authenticates through an external identity provider.
    pub fn is_federated(&self) -> bool {
        self.origin == IdentityOrigin::Federated
    }

    /// Check if the account has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
