//! # Ticketing Auth
//!
//! This crate authenticates end users of the ticketing platform and manages
//! the lifecycle of the platform's own session tokens.
//!
//! ## Overview
//!
//! The ticketing-auth crate handles:
//! - **Federation**: Verifying identity tokens issued by the external identity provider
//! - **Phone OTP**: Issuing, delivering and verifying one-time codes with a per-phone quota
//! - **Tokens**: HS256 access/refresh pairs with purpose-specific secrets
//! - **Revocation**: A cache-backed whitelist of the one trusted access token per account
//! - **Accounts**: Find-or-provision on sign-in, sign-up, sign-out and refresh
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ticketing_accounts::MemoryAccountStore;
//! use ticketing_auth::{AuthConfig, AuthService, TokenPurpose};
//! use ticketing_cache::MemoryCacheStore;
//! use ticketing_providers::{identity, MessagingClient, ProfileClient, ProviderConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let providers = ProviderConfig::from_env();
//!     let identity = identity::initialize(&providers)?;
//!     let messaging = Arc::new(MessagingClient::new(providers.messaging.clone(), providers.timeout())?);
//!     let profiles = Arc::new(ProfileClient::new(providers.profile.clone(), providers.timeout())?);
//!
//!     let auth = AuthService::with_clients(
//!         AuthConfig::from_env(),
//!         Arc::new(MemoryCacheStore::new()),
//!         Arc::new(MemoryAccountStore::new()),
//!         identity,
//!         messaging,
//!         profiles,
//!     )?;
//!
//!     auth.request_otp("0901234567").await?;
//!     let session = auth.sign_in_with_code("0901234567", "482913").await?;
//!
//!     let validation = auth
//!         .validate_token(&session.tokens.access_token, TokenPurpose::Access)
//!         .await?;
//!     auth.sign_out(&validation.context).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`AuthError`], a closed taxonomy. Use
//! [`AuthError::kind`] or [`AuthError::status_code`] to map failures at the
//! boundary; internal detail is logged and never returned.

pub mod claims;
pub mod config;
pub mod context;
pub mod error;
pub mod federation;
pub mod fingerprint;
pub mod jwt;
pub mod otp;
pub mod providers;
pub mod registry;
pub mod service;

pub use claims::{TokenClaims, TokenPurpose};
pub use config::{AuthConfig, ConfigError};
pub use context::AuthContext;
pub use error::{AuthError, AuthResult, ErrorKind, TokenRejection};
pub use federation::{FederatedIdentity, FederationValidator};
pub use jwt::{TokenPair, TokenService};
pub use otp::{CodeGenerator, OtpEngine, OtpIssued, OtpPolicy, RandomCodeGenerator};
pub use providers::{IdentityProvider, OtpDispatcher, ProfileProvisioner, TemplateOtpDispatcher};
pub use registry::SessionRegistry;
pub use service::{AccountSummary, AuthService, SignIn, TokenValidation};
