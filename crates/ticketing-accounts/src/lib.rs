//! # Ticketing Accounts
//!
//! This crate provides the internal account record that every ticketing
//! sign-in path resolves to, and the storage behind it.
//!
//! ## Overview
//!
//! The ticketing-accounts crate handles:
//! - **Accounts**: Identity records with a flat role tag and soft deletion
//! - **Identity origin**: Federated token or phone OTP
//! - **Storage**: Point lookups, insert, full-row update, soft delete
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ticketing_accounts::{Account, AccountStore, FederationProvider, MemoryAccountStore};
//!
//! async fn example() {
//!     let store = MemoryAccountStore::new();
//!
//!     let account = Account::federated("uid-abc", FederationProvider::Google);
//!     store.insert(&account).await.unwrap();
//!
//!     let found = store
//!         .find_by_subject_and_provider("uid-abc", FederationProvider::Google)
//!         .await
//!         .unwrap();
//!     assert!(found.is_some());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `memory` (default): In-memory store for single-process apps and tests
//! - `postgres`: PostgreSQL store over a `sqlx::PgPool`, with bundled migrations

pub mod account;
pub mod store;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-export main types for convenience
pub use account::{Account, FederationProvider, IdentityOrigin, Role};
pub use store::{AccountStore, StoreError, StoreResult};

#[cfg(feature = "memory")]
pub use store::MemoryAccountStore;

#[cfg(feature = "postgres")]
pub use postgres::PgAccountStore;
