//! PostgreSQL-backed account store.
//!
//! Enum columns are stored as their lowercase string forms and constrained
//! by `CHECK` clauses in the migration, so rows stay readable from `psql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::{Account, FederationProvider, IdentityOrigin, Role};
use crate::store::{AccountStore, StoreError, StoreResult};

const SELECT_LIVE: &str = r#"
    SELECT id, subject, email, phone_number, email_verified, phone_verified,
           role, origin, provider, custom_claims, id_token, refresh_token,
           last_login_at, created_at, updated_at, deleted_at
    FROM accounts
    WHERE deleted_at IS NULL
"#;

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    subject: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    email_verified: bool,
    phone_verified: bool,
    role: String,
    origin: String,
    provider: String,
    custom_claims: Option<serde_json::Value>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> StoreResult<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{}'", row.role)))?;
        let origin = IdentityOrigin::parse(&row.origin)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown origin '{}'", row.origin)))?;
        let provider = FederationProvider::parse(&row.provider)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown provider '{}'", row.provider)))?;

        Ok(Account {
            id: row.id,
            subject: row.subject,
            email: row.email,
            phone_number: row.phone_number,
            email_verified: row.email_verified,
            phone_verified: row.phone_verified,
            role,
            origin,
            provider,
            custom_claims: row.custom_claims,
            id_token: row.id_token,
            refresh_token: row.refresh_token,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// Map a unique index name from the migration back to its column.
fn unique_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("accounts_subject_key") => "subject",
        Some("accounts_email_key") => "email",
        Some("accounts_phone_number_key") => "phone_number",
        Some("accounts_pkey") => "id",
        _ => "value",
    }
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::UniqueViolation {
                field: unique_field(db.constraint()).to_string(),
            };
        }
    }
    StoreError::Database(e.to_string())
}

/// PostgreSQL account store.
///
/// The pool is built and owned by the embedding binary.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn fetch_live(&self, sql: &str, binds: LookupBinds<'_>) -> StoreResult<Option<Account>> {
        let query = sqlx::query_as::<_, AccountRow>(sql);
        let query = match binds {
            LookupBinds::Id(id) => query.bind(id),
            LookupBinds::Text(value) => query.bind(value.to_string()),
            LookupBinds::TextPair(first, second) => {
                query.bind(first.to_string()).bind(second.to_string())
            }
            LookupBinds::IdAndText(id, value) => query.bind(id).bind(value.to_string()),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Account::try_from).transpose()
    }
}

/// Bind parameters for single-row lookups.
enum LookupBinds<'a> {
    Id(Uuid),
    Text(&'a str),
    TextPair(&'a str, &'a str),
    IdAndText(Uuid, &'a str),
}

fn select_live_where(clause: &str) -> String {
    format!("{} AND {} LIMIT 1", SELECT_LIVE, clause)
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let sql = select_live_where("id = $1");
        self.fetch_live(&sql, LookupBinds::Id(id)).await
    }

    async fn find_by_subject(&self, subject: &str) -> StoreResult<Option<Account>> {
        let sql = select_live_where("subject = $1");
        self.fetch_live(&sql, LookupBinds::Text(subject)).await
    }

    async fn find_by_subject_and_provider(
        &self,
        subject: &str,
        provider: FederationProvider,
    ) -> StoreResult<Option<Account>> {
        let sql = select_live_where("subject = $1 AND provider = $2");
        self.fetch_live(&sql, LookupBinds::TextPair(subject, provider.as_str()))
            .await
    }

    async fn find_by_phone(&self, phone_number: &str) -> StoreResult<Option<Account>> {
        let sql = select_live_where("phone_number = $1");
        self.fetch_live(&sql, LookupBinds::Text(phone_number)).await
    }

    async fn find_by_id_and_refresh_token(
        &self,
        id: Uuid,
        refresh_token: &str,
    ) -> StoreResult<Option<Account>> {
        let sql = select_live_where("id = $1 AND refresh_token = $2");
        self.fetch_live(&sql, LookupBinds::IdAndText(id, refresh_token))
            .await
    }

    async fn insert(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, subject, email, phone_number, email_verified, phone_verified,
                role, origin, provider, custom_claims, id_token, refresh_token,
                last_login_at, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(account.id)
        .bind(&account.subject)
        .bind(&account.email)
        .bind(&account.phone_number)
        .bind(account.email_verified)
        .bind(account.phone_verified)
        .bind(account.role.as_str())
        .bind(account.origin.as_str())
        .bind(account.provider.as_str())
        .bind(&account.custom_claims)
        .bind(&account.id_token)
        .bind(&account.refresh_token)
        .bind(account.last_login_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        tracing::debug!(account_id = %account.id, "Account inserted");
        Ok(())
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                subject = $2, email = $3, phone_number = $4,
                email_verified = $5, phone_verified = $6,
                role = $7, origin = $8, provider = $9, custom_claims = $10,
                id_token = $11, refresh_token = $12, last_login_at = $13,
                updated_at = $14
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(account.id)
        .bind(&account.subject)
        .bind(&account.email)
        .bind(&account.phone_number)
        .bind(account.email_verified)
        .bind(account.phone_verified)
        .bind(account.role.as_str())
        .bind(account.origin.as_str())
        .bind(account.provider.as_str())
        .bind(&account.custom_claims)
        .bind(&account.id_token)
        .bind(&account.refresh_token)
        .bind(account.last_login_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(account.id));
        }
        Ok(())
    }

    async fn rotate_refresh_token(&self, account: &Account, expected: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                refresh_token = $3, last_login_at = $4, updated_at = $5
            WHERE id = $1 AND refresh_token = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(account.id)
        .bind(expected)
        .bind(&account.refresh_token)
        .bind(account.last_login_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rotated = result.rows_affected() > 0;
        if !rotated {
            tracing::debug!(account_id = %account.id, "Refresh token already superseded");
        }
        Ok(rotated)
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(account_id = %id, "Account soft-deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str, origin: &str, provider: &str) -> AccountRow {
        let now = Utc::now();
        AccountRow {
            id: Uuid::now_v7(),
            subject: Some("uid-abc".to_string()),
            email: None,
            phone_number: None,
            email_verified: false,
            phone_verified: false,
            role: role.to_string(),
            origin: origin.to_string(),
            provider: provider.to_string(),
            custom_claims: None,
            id_token: None,
            refresh_token: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_row_conversion() {
        let account = Account::try_from(row("business", "federated", "google")).unwrap();
        assert_eq!(account.role, Role::Business);
        assert_eq!(account.origin, IdentityOrigin::Federated);
        assert_eq!(account.provider, FederationProvider::Google);
    }

    #[test]
    fn test_row_with_unknown_enum_is_corrupt() {
        let err = Account::try_from(row("owner", "federated", "google")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));

        let err = Account::try_from(row("user", "password", "google")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_unique_field_from_constraint() {
        assert_eq!(unique_field(Some("accounts_phone_number_key")), "phone_number");
        assert_eq!(unique_field(Some("accounts_subject_key")), "subject");
        assert_eq!(unique_field(None), "value");
    }
}
