//! # Ticketing Cache
//!
//! This crate provides the key/value cache adapter used by the ticketing
//! authentication service for OTP challenges, rate-limit counters and the
//! access-token whitelist.
//!
//! ## Overview
//!
//! The ticketing-cache crate handles:
//! - **TTL storage**: `SETEX`, `GET`, `DEL`, `EXPIRE`, `TTL`
//! - **Counters**: `INCR` and a windowed increment that arms its expiry once
//! - **Single-use values**: atomic compare-and-delete
//! - **Health**: `PING`
//!
//! ## Features
//!
//! - `memory` (default): In-memory store for single-process apps and tests
//! - `redis`: Redis-backed store for distributed deployments
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ticketing_cache::{CacheStore, MemoryCacheStore};
//!
//! async fn example() {
//!     let cache = MemoryCacheStore::new();
//!
//!     cache.set_ex("otp:0901234567", "482913", Duration::from_secs(120)).await.unwrap();
//!
//!     // Succeeds once; a replay with the same code finds nothing.
//!     assert!(cache.compare_and_delete("otp:0901234567", "482913").await.unwrap());
//!     assert!(!cache.compare_and_delete("otp:0901234567", "482913").await.unwrap());
//! }
//! ```

pub mod config;
pub mod store;

#[cfg(feature = "redis")]
pub mod redis;

// Re-export main types
pub use config::CacheConfig;
pub use store::{CacheError, CacheResult, CacheStore, KeyTtl};

#[cfg(feature = "memory")]
pub use store::MemoryCacheStore;

#[cfg(feature = "redis")]
pub use redis::RedisCacheStore;
