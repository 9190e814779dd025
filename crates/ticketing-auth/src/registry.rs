//! Session revocation registry
//!
//! A cache-backed whitelist holding the one access token currently trusted
//! for each account. A valid signature is not enough: the token must also be
//! the whitelisted one, so deleting the entry revokes it immediately.

use crate::error::AuthResult;
use crate::fingerprint::fingerprint;
use std::sync::Arc;
use std::time::Duration;
use ticketing_cache::{CacheStore, KeyTtl};
use tracing::{debug, info};
use uuid::Uuid;

/// Cache key prefix for whitelist entries.
const KEY_PREFIX: &str = "access_token";

/// Access-token whitelist keyed by account id.
#[derive(Clone)]
pub struct SessionRegistry {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionRegistry {
    /// Create a registry whose entries live for `ttl` (the access-token lifetime).
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    fn key(account_id: Uuid) -> String {
        format!("{}:{}", KEY_PREFIX, account_id)
    }

    /// Record `token` as the sole trusted access token for the account.
    ///
    /// Last write wins: any previously whitelisted token stops validating.
    pub async fn whitelist(&self, account_id: Uuid, token: &str) -> AuthResult<()> {
        self.cache
            .set_ex(&Self::key(account_id), token, self.ttl)
            .await?;
        debug!(%account_id, token = %fingerprint(token), "Access token whitelisted");
        Ok(())
    }

    /// Whether `token` is the live whitelisted token for the account.
    pub async fn is_valid(&self, account_id: Uuid, token: &str) -> AuthResult<bool> {
        let stored = self.cache.get(&Self::key(account_id)).await?;
        Ok(stored.as_deref() == Some(token))
    }

    /// Drop the whitelist entry. Returns whether one existed.
    pub async fn revoke(&self, account_id: Uuid) -> AuthResult<bool> {
        let removed = self.cache.del(&Self::key(account_id)).await?;
        info!(%account_id, removed, "Access token revoked");
        Ok(removed)
    }

    /// Remaining lifetime of the whitelist entry, if one exists.
    pub async fn remaining_ttl(&self, account_id: Uuid) -> AuthResult<Option<Duration>> {
        let ttl = self.cache.ttl(&Self::key(account_id)).await?;
        Ok(match ttl {
            KeyTtl::Expires(remaining) => Some(remaining),
            KeyTtl::Persistent => Some(self.ttl),
            KeyTtl::Missing => None,
        })
    }

    /// Re-arm the entry's TTL without changing the trusted token.
    pub async fn extend(&self, account_id: Uuid) -> AuthResult<bool> {
        Ok(self.cache.expire(&Self::key(account_id), self.ttl).await?)
    }
}
