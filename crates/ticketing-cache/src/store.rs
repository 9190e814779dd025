//! Cache store abstraction
//!
//! This module provides the cache store trait and the in-memory
//! implementation used by single-process deployments and tests.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "memory")]
use std::collections::HashMap;
#[cfg(feature = "memory")]
use std::sync::Arc;
#[cfg(feature = "memory")]
use tokio::sync::Mutex;
#[cfg(feature = "memory")]
use tokio::time::Instant;

/// Cache store error types.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Command failed on the server
    #[error("Command failed: {0}")]
    CommandError(String),

    /// Stored value had an unexpected shape (e.g. INCR on a non-integer)
    #[error("Invalid value for key {key}: {message}")]
    InvalidValue {
        /// Cache key
        key: String,
        /// Error message
        message: String,
    },
}

/// Result type for cache store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Remaining lifetime of a key, as reported by `TTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist (expired or never set)
    Missing,
    /// Key exists without an expiry
    Persistent,
    /// Key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Remaining lifetime in whole seconds, if the key expires.
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            KeyTtl::Expires(d) => Some(d.as_secs()),
            _ => None,
        }
    }

    /// Map a raw `TTL` reply (-2 missing, -1 persistent) to a `KeyTtl`.
    pub fn from_redis_reply(reply: i64) -> Self {
        match reply {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            secs if secs >= 0 => KeyTtl::Expires(Duration::from_secs(secs as u64)),
            _ => KeyTtl::Missing,
        }
    }
}

/// Key/value cache store with TTL expiry and atomic primitives.
///
/// Implementations must make `incr_within_window` and `compare_and_delete`
/// atomic with respect to concurrent callers on the same key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `SETEX key ttl value`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// `GET key`
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// `DEL key`. Returns whether a key was removed.
    async fn del(&self, key: &str) -> CacheResult<bool>;

    /// `INCR key`. A missing key counts from zero and is created without expiry.
    async fn incr(&self, key: &str) -> CacheResult<i64>;

    /// `EXPIRE key ttl`. Returns false when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// `TTL key`
    async fn ttl(&self, key: &str) -> CacheResult<KeyTtl>;

    /// `PING`
    async fn ping(&self) -> CacheResult<()>;

    /// Increment a counter and arm its expiry only when this increment created it.
    ///
    /// Later increments never move the window; it resets only when the key expires.
    async fn incr_within_window(&self, key: &str, window: Duration) -> CacheResult<i64>;

    /// Delete `key` only if it currently holds `expected`.
    ///
    /// Returns true when the value matched and was removed. Two concurrent
    /// calls with the same expected value succeed at most once.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool>;
}

#[cfg(feature = "memory")]
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

#[cfg(feature = "memory")]
impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory cache store implementation.
///
/// This is suitable for single-process applications and testing.
/// Expiry uses `tokio::time::Instant`, so paused-clock tests can
/// advance time past a TTL. For distributed systems, use the Redis backend.
#[cfg(feature = "memory")]
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

#[cfg(feature = "memory")]
impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore").finish()
    }
}

#[cfg(feature = "memory")]
impl MemoryCacheStore {
    /// Create a new, empty in-memory cache store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Whether the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Look up a live entry, evicting it if it has expired.
    fn live_entry<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        let expired = entries.get(key).is_some_and(|e| !e.is_live(now));
        if expired {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[cfg(feature = "memory")]
#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        Ok(Self::live_entry(&mut entries, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut entries = self.entries.lock().await;
        match Self::live_entry(&mut entries, key, Instant::now()) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| CacheError::InvalidValue {
                    key: key.to_string(),
                    message: "value is not an integer".to_string(),
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match Self::live_entry(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> CacheResult<KeyTtl> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(match Self::live_entry(&mut entries, key, now) {
            None => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires(at.saturating_duration_since(now)),
        })
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn incr_within_window(&self, key: &str, window: Duration) -> CacheResult<i64> {
        // Single lock scope keeps the increment and the expiry arming atomic.
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match Self::live_entry(&mut entries, key, now) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| CacheError::InvalidValue {
                    key: key.to_string(),
                    message: "value is not an integer".to_string(),
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: Some(now + window),
                    },
                );
                Ok(1)
            }
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let mut entries = self.entries.lock().await;
        let matches = Self::live_entry(&mut entries, key, Instant::now())
            .is_some_and(|e| e.value == expected);
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }
}
