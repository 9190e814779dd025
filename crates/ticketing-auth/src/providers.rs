//! Seams to the external collaborators.
//!
//! The auth core talks to the identity provider, the messaging provider and
//! the profile service through these traits. The HTTP clients from
//! `ticketing-providers` implement them; tests substitute fakes.

use async_trait::async_trait;
use std::sync::Arc;
use ticketing_providers::{
    DecodedIdToken, DispatchReceipt, IdentityClient, MessagingClient, NewProfile, Profile,
    ProfileClient, ProviderResult,
};

/// Verifies federated identity tokens and revokes federated sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a raw identity token and return its decoded claims.
    async fn verify_token(&self, id_token: &str) -> ProviderResult<DecodedIdToken>;

    /// Revoke every session the provider holds for `uid`.
    async fn revoke_sessions(&self, uid: &str) -> ProviderResult<()>;
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    async fn verify_token(&self, id_token: &str) -> ProviderResult<DecodedIdToken> {
        IdentityClient::verify_token(self, id_token).await
    }

    async fn revoke_sessions(&self, uid: &str) -> ProviderResult<()> {
        IdentityClient::revoke_sessions(self, uid).await
    }
}

/// Delivers an OTP code to a phone number.
#[async_trait]
pub trait OtpDispatcher: Send + Sync {
    /// Send `code` to `phone`.
    async fn dispatch(&self, phone: &str, code: &str) -> ProviderResult<DispatchReceipt>;
}

/// Sends OTP codes through a messaging template.
#[derive(Debug, Clone)]
pub struct TemplateOtpDispatcher {
    client: Arc<MessagingClient>,
    template_id: String,
}

impl TemplateOtpDispatcher {
    /// Create a dispatcher using `template_id` for every message.
    pub fn new(client: Arc<MessagingClient>, template_id: impl Into<String>) -> Self {
        Self {
            client,
            template_id: template_id.into(),
        }
    }
}

#[async_trait]
impl OtpDispatcher for TemplateOtpDispatcher {
    async fn dispatch(&self, phone: &str, code: &str) -> ProviderResult<DispatchReceipt> {
        self.client.send_otp(phone, &self.template_id, code).await
    }
}

/// Creates the public profile record for a new account.
#[async_trait]
pub trait ProfileProvisioner: Send + Sync {
    /// Create the profile; any failure aborts account creation.
    async fn provision(&self, profile: &NewProfile) -> ProviderResult<Profile>;
}

#[async_trait]
impl ProfileProvisioner for ProfileClient {
    async fn provision(&self, profile: &NewProfile) -> ProviderResult<Profile> {
        self.create(profile).await
    }
}
