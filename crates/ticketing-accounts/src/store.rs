//! Account store abstraction
//!
//! This module provides the account store trait and the in-memory
//! implementation used by single-process deployments and tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::account::{Account, FederationProvider};

#[cfg(feature = "memory")]
use std::collections::HashMap;
#[cfg(feature = "memory")]
use std::sync::Arc;
#[cfg(feature = "memory")]
use tokio::sync::RwLock;

/// Account store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique column (subject, email, phone) already holds this value
    #[error("Account with this {field} already exists")]
    UniqueViolation {
        /// Column that conflicted
        field: String,
    },

    /// Account not found for update
    #[error("Account not found: {0}")]
    NotFound(Uuid),

    /// A stored row could not be mapped back to an account
    #[error("Corrupt account row: {0}")]
    Corrupt(String),

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for account store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent account storage.
///
/// Soft-deleted accounts are invisible to every lookup. Subject id, email
/// and phone number are each unique among live accounts when present.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by internal id.
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;

    /// Look up an account by external subject id, across providers.
    async fn find_by_subject(&self, subject: &str) -> StoreResult<Option<Account>>;

    /// Look up an account by the (subject id, provider) pair.
    async fn find_by_subject_and_provider(
        &self,
        subject: &str,
        provider: FederationProvider,
    ) -> StoreResult<Option<Account>>;

    /// Look up an account by phone number.
    async fn find_by_phone(&self, phone_number: &str) -> StoreResult<Option<Account>>;

    /// Look up an account by internal id whose stored refresh token equals `refresh_token`.
    async fn find_by_id_and_refresh_token(
        &self,
        id: Uuid,
        refresh_token: &str,
    ) -> StoreResult<Option<Account>>;

    /// Insert a new account.
    async fn insert(&self, account: &Account) -> StoreResult<()>;

    /// Replace every column of an existing live account.
    async fn update(&self, account: &Account) -> StoreResult<()>;

    /// Store `account`'s refresh token and sign-in timestamps, but only while
    /// the live row with that id still holds `expected` as its refresh token.
    ///
    /// Returns false when the account is gone or the token was already
    /// superseded, so at most one caller can rotate a given token.
    async fn rotate_refresh_token(&self, account: &Account, expected: &str) -> StoreResult<bool>;

    /// Mark an account deleted. Returns false when no live account had that id.
    async fn soft_delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// In-memory account store implementation.
///
/// This is suitable for single-process applications and testing.
/// For durable storage, use the PostgreSQL backend.
#[cfg(feature = "memory")]
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

#[cfg(feature = "memory")]
impl MemoryAccountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts held, including soft-deleted ones.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Whether the store holds no accounts.
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    async fn find_live<F>(&self, predicate: F) -> Option<Account>
    where
        F: Fn(&Account) -> bool + Send,
    {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| !a.is_deleted() && predicate(a))
            .cloned()
    }
}

#[cfg(feature = "memory")]
fn check_unique<'a>(
    candidate: &Account,
    others: impl Iterator<Item = &'a Account>,
) -> StoreResult<()> {
    fn same(a: &Option<String>, b: &Option<String>) -> bool {
        matches!((a, b), (Some(x), Some(y)) if x == y)
    }

    for other in others.filter(|o| o.id != candidate.id && !o.is_deleted()) {
        let field = if same(&other.subject, &candidate.subject) {
            "subject"
        } else if same(&other.email, &candidate.email) {
            "email"
        } else if same(&other.phone_number, &candidate.phone_number) {
            "phone_number"
        } else {
            continue;
        };

        return Err(StoreError::UniqueViolation {
            field: field.to_string(),
        });
    }

    Ok(())
}

#[cfg(feature = "memory")]
#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .get(&id)
            .filter(|a| !a.is_deleted())
            .cloned())
    }

    async fn find_by_subject(&self, subject: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .find_live(|a| a.subject.as_deref() == Some(subject))
            .await)
    }

    async fn find_by_subject_and_provider(
        &self,
        subject: &str,
        provider: FederationProvider,
    ) -> StoreResult<Option<Account>> {
        Ok(self
            .find_live(|a| a.subject.as_deref() == Some(subject) && a.provider == provider)
            .await)
    }

    async fn find_by_phone(&self, phone_number: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .find_live(|a| a.phone_number.as_deref() == Some(phone_number))
            .await)
    }

    async fn find_by_id_and_refresh_token(
        &self,
        id: Uuid,
        refresh_token: &str,
    ) -> StoreResult<Option<Account>> {
        Ok(self
            .find_by_id(id)
            .await?
            .filter(|a| a.refresh_token_matches(refresh_token)))
    }

    async fn insert(&self, account: &Account) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;

        if accounts.contains_key(&account.id) {
            return Err(StoreError::UniqueViolation {
                field: "id".to_string(),
            });
        }
        check_unique(account, accounts.values())?;

        accounts.insert(account.id, account.clone());
        tracing::debug!(account_id = %account.id, "Account inserted");
        Ok(())
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;

        match accounts.get(&account.id) {
            Some(existing) if !existing.is_deleted() => {}
            _ => return Err(StoreError::NotFound(account.id)),
        }
        check_unique(account, accounts.values())?;

        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn rotate_refresh_token(&self, account: &Account, expected: &str) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().await;

        match accounts.get_mut(&account.id) {
            Some(stored) if !stored.is_deleted() && stored.refresh_token_matches(expected) => {
                stored.refresh_token = account.refresh_token.clone();
                stored.last_login_at = account.last_login_at;
                stored.updated_at = account.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().await;

        match accounts.get_mut(&id) {
            Some(account) if !account.is_deleted() => {
                let now = chrono::Utc::now();
                account.deleted_at = Some(now);
                account.updated_at = now;
                tracing::info!(account_id = %id, "Account soft-deleted");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_lookups() {
        let store = MemoryAccountStore::new();
        let account = Account::federated("uid-abc", FederationProvider::Google)
            .with_email("ana@example.com", true);
        store.insert(&account).await.unwrap();

        let by_id = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(by_id.id, account.id);

        let by_subject = store.find_by_subject("uid-abc").await.unwrap();
        assert!(by_subject.is_some());

        let by_pair = store
            .find_by_subject_and_provider("uid-abc", FederationProvider::Google)
            .await
            .unwrap();
        assert!(by_pair.is_some());

        let wrong_provider = store
            .find_by_subject_and_provider("uid-abc", FederationProvider::Facebook)
            .await
            .unwrap();
        assert!(wrong_provider.is_none());
    }

    #[tokio::test]
    async fn test_unique_columns_enforced() {
        let store = MemoryAccountStore::new();
        store
            .insert(&Account::phone("0901234567"))
            .await
            .unwrap();

        let err = store
            .insert(&Account::phone("0901234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref field } if field == "phone_number"));

        store
            .insert(&Account::federated("uid-abc", FederationProvider::Google))
            .await
            .unwrap();
        let err = store
            .insert(&Account::federated("uid-abc", FederationProvider::Facebook))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref field } if field == "subject"));

        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_refresh_token_lookup_requires_exact_match() {
        let store = MemoryAccountStore::new();
        let mut account = Account::phone("0901234567");
        account.record_sign_in("refresh-1", None);
        store.insert(&account).await.unwrap();

        assert!(store
            .find_by_id_and_refresh_token(account.id, "refresh-1")
            .await
            .unwrap()
            .is_some());

        account.record_sign_in("refresh-2", None);
        store.update(&account).await.unwrap();

        assert!(store
            .find_by_id_and_refresh_token(account.id, "refresh-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rotate_refresh_token_is_single_use() {
        let store = MemoryAccountStore::new();
        let mut account = Account::phone("0901234567");
        account.record_sign_in("refresh-1", None);
        store.insert(&account).await.unwrap();

        // Two callers both read refresh-1 before either writes.
        let mut first = account.clone();
        first.record_sign_in("refresh-2", None);
        let mut second = account.clone();
        second.record_sign_in("refresh-3", None);

        assert!(store.rotate_refresh_token(&first, "refresh-1").await.unwrap());
        assert!(!store.rotate_refresh_token(&second, "refresh-1").await.unwrap());

        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert!(stored.refresh_token_matches("refresh-2"));
        assert_eq!(stored.last_login_at, first.last_login_at);
    }

    #[tokio::test]
    async fn test_rotate_refresh_token_skips_deleted_account() {
        let store = MemoryAccountStore::new();
        let mut account = Account::phone("0901234567");
        account.record_sign_in("refresh-1", None);
        store.insert(&account).await.unwrap();
        store.soft_delete(account.id).await.unwrap();

        account.record_sign_in("refresh-2", None);
        assert!(!store.rotate_refresh_token(&account, "refresh-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_soft_deleted_accounts_are_invisible() {
        let store = MemoryAccountStore::new();
        let account = Account::phone("0901234567");
        store.insert(&account).await.unwrap();

        assert!(store.soft_delete(account.id).await.unwrap());
        assert!(!store.soft_delete(account.id).await.unwrap());

        assert!(store.find_by_id(account.id).await.unwrap().is_none());
        assert!(store.find_by_phone("0901234567").await.unwrap().is_none());
        assert!(matches!(
            store.update(&account).await,
            Err(StoreError::NotFound(_))
        ));

        // The phone number is free again for a new live account.
        store.insert(&Account::phone("0901234567")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let store = MemoryAccountStore::new();
        let account = Account::phone("0901234567");
        assert!(matches!(
            store.update(&account).await,
            Err(StoreError::NotFound(id)) if id == account.id
        ));
        assert!(store.is_empty().await);
    }
}
