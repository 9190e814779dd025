//! External profile service client.
//!
//! The profile service keeps the public-facing user record (display name,
//! avatar) keyed by the internal account id.

use crate::config::Endpoint;
use crate::error::{build_client, check_status, handle_response, ProviderError, ProviderResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

const SERVICE: &str = "profile";

/// Parameters for creating a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Internal account id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Profile record as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Internal account id.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,
}

/// Profile service client.
#[derive(Clone)]
pub struct ProfileClient {
    /// HTTP client instance.
    client: Client,

    /// Service endpoint configuration.
    endpoint: Endpoint,
}

impl std::fmt::Debug for ProfileClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileClient")
            .field("base_url", &self.endpoint.base_url)
            .finish()
    }
}

impl ProfileClient {
    /// Create a new profile client.
    pub fn new(endpoint: Endpoint, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
        })
    }

    fn user_url(&self, id: &str) -> String {
        self.endpoint.url(&format!("/api/v1/users/{}", id))
    }

    /// Create a profile.
    #[instrument(skip(self, profile), fields(profile_id = %profile.id))]
    pub async fn create(&self, profile: &NewProfile) -> ProviderResult<Profile> {
        let url = self.endpoint.url("/api/v1/users");
        let response = self
            .client
            .post(&url)
            .json(profile)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;

        let created = handle_response(SERVICE, response).await?;
        info!("Profile created");
        Ok(created)
    }

    /// Fetch a profile. A 404 answer yields `None`.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> ProviderResult<Option<Profile>> {
        let response = self
            .client
            .get(self.user_url(id))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Profile not found");
            return Ok(None);
        }

        handle_response(SERVICE, response).await.map(Some)
    }

    /// Apply a partial update.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: &str, update: &ProfileUpdate) -> ProviderResult<Profile> {
        let response = self
            .client
            .put(self.user_url(id))
            .json(update)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;

        handle_response(SERVICE, response).await
    }

    /// Delete a profile.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> ProviderResult<()> {
        let response = self
            .client
            .delete(self.user_url(id))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(SERVICE, e))?;

        check_status(SERVICE, response).await?;
        info!("Profile deleted");
        Ok(())
    }
}
