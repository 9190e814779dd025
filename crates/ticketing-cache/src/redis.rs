//! Redis-backed cache store for distributed deployments.
//!
//! This module provides a Redis implementation of [`CacheStore`] that keeps a
//! single multiplexed connection for the lifetime of the process. Atomic
//! primitives are implemented as server-side Lua scripts.

use crate::store::{CacheError, CacheResult, CacheStore, KeyTtl};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError, Script};
use std::time::Duration;

/// Increment and arm the expiry only on the increment that created the key.
const INCR_WITHIN_WINDOW: &str = r"
local n = redis.call('INCR', KEYS[1])
if n == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return n
";

/// Delete the key only when it still holds the expected value.
const COMPARE_AND_DELETE: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

/// Redis-backed cache store.
///
/// All keys are namespaced with a prefix (`{prefix}:{key}`) so several
/// services can share one Redis database.
///
/// # Example
///
/// ```rust,no_run
/// use ticketing_cache::RedisCacheStore;
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let store = RedisCacheStore::new("redis://localhost:6379", "auth").await?;
///     Ok(())
/// }
/// ```
pub struct RedisCacheStore {
    /// Long-lived multiplexed connection (cheap to clone)
    connection: MultiplexedConnection,

    /// Key prefix for all Redis operations
    prefix: String,

    incr_script: Script,

    compare_delete_script: Script,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl RedisCacheStore {
    /// Connect to Redis and create a new cache store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., `redis://localhost:6379`)
    /// * `prefix` - Key prefix for Redis operations (e.g., `auth`)
    ///
    /// # Returns
    ///
    /// A new `RedisCacheStore` or a connection error
    pub async fn new(redis_url: &str, prefix: &str) -> CacheResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        tracing::info!(prefix = %prefix, "Redis cache store connected");

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
            incr_script: Script::new(INCR_WITHIN_WINDOW),
            compare_delete_script: Script::new(COMPARE_AND_DELETE),
        })
    }

    /// Connect using a [`CacheConfig`](crate::CacheConfig).
    pub async fn from_config(config: &crate::CacheConfig) -> CacheResult<Self> {
        Self::new(&config.redis_url, &config.key_prefix).await
    }

    fn key(&self, key: &str) -> String {
        prefixed_key(&self.prefix, key)
    }

    fn conn(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

fn prefixed_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}

fn command_error(e: RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
        CacheError::ConnectionError(e.to_string())
    } else {
        CacheError::CommandError(e.to_string())
    }
}

/// Redis rejects a zero expiry, so sub-second TTLs round up to one second.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn();
        redis::cmd("SETEX")
            .arg(self.key(key))
            .arg(ttl_secs(ttl))
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn();
        conn.get::<_, Option<String>>(self.key(key))
            .await
            .map_err(command_error)
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn();
        let removed: i64 = conn.del(self.key(key)).await.map_err(command_error)?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.conn();
        conn.incr::<_, _, i64>(self.key(key), 1)
            .await
            .map_err(command_error)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.conn();
        let applied: i64 = redis::cmd("EXPIRE")
            .arg(self.key(key))
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(applied == 1)
    }

    async fn ttl(&self, key: &str) -> CacheResult<KeyTtl> {
        let mut conn = self.conn();
        let reply: i64 = redis::cmd("TTL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(KeyTtl::from_redis_reply(reply))
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(CacheError::CommandError(format!(
                "unexpected PING reply: {}",
                reply
            )))
        }
    }

    async fn incr_within_window(&self, key: &str, window: Duration) -> CacheResult<i64> {
        let mut conn = self.conn();
        self.incr_script
            .key(self.key(key))
            .arg(ttl_secs(window))
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let mut conn = self.conn();
        let removed: i64 = self
            .compare_delete_script
            .key(self.key(key))
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(removed == 1)
    }
}
