//! End-to-end authentication flows over in-memory stores and fake providers.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ticketing_accounts::{
    Account, AccountStore, FederationProvider, IdentityOrigin, MemoryAccountStore, Role,
    StoreResult,
};
use ticketing_auth::{
    AuthConfig, AuthError, AuthService, CodeGenerator, IdentityProvider, OtpDispatcher,
    ProfileProvisioner, TokenPurpose,
};
use ticketing_cache::MemoryCacheStore;
use ticketing_providers::{
    DecodedIdToken, DispatchReceipt, NewProfile, Profile, ProviderError, ProviderResult,
};
use uuid::Uuid;

const PHONE: &str = "0901234567";
const CODE: &str = "482913";

#[derive(Default)]
struct FakeIdentity {
    tokens: Mutex<HashMap<String, DecodedIdToken>>,
    revoked: Mutex<Vec<String>>,
    fail_revoke: AtomicBool,
}

impl FakeIdentity {
    fn issue(&self, raw: &str, uid: &str, sign_in_provider: &str) {
        let decoded: DecodedIdToken = serde_json::from_value(json!({
            "uid": uid,
            "email": format!("{}@example.com", uid),
            "email_verified": true,
            "name": "Ana Nguyen",
            "picture": "https://cdn.example.com/ana.png",
            "auth_time": 1700000000,
            "iss": "https://securetoken.google.com/ticketing",
            "firebase": { "sign_in_provider": sign_in_provider }
        }))
        .unwrap();
        self.tokens.lock().unwrap().insert(raw.to_string(), decoded);
    }

    fn issue_with_phone(&self, raw: &str, uid: &str, sign_in_provider: &str, phone: &str) {
        self.issue(raw, uid, sign_in_provider);
        if let Some(decoded) = self.tokens.lock().unwrap().get_mut(raw) {
            decoded.phone_number = Some(phone.to_string());
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_token(&self, id_token: &str) -> ProviderResult<DecodedIdToken> {
        self.tokens
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected {
                service: "identity",
                status: 400,
                message: "INVALID_ID_TOKEN".to_string(),
            })
    }

    async fn revoke_sessions(&self, uid: &str) -> ProviderResult<()> {
        self.revoked.lock().unwrap().push(uid.to_string());
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable {
                service: "identity",
                message: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeMessaging {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl OtpDispatcher for FakeMessaging {
    async fn dispatch(&self, phone: &str, code: &str) -> ProviderResult<DispatchReceipt> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), code.to_string()));
        Ok(DispatchReceipt {
            message_id: Some("msg-1".to_string()),
            tracking_id: "tracking-1".to_string(),
        })
    }
}

#[derive(Default)]
struct FakeProfiles {
    created: Mutex<Vec<NewProfile>>,
    down: AtomicBool,
}

#[async_trait]
impl ProfileProvisioner for FakeProfiles {
    async fn provision(&self, profile: &NewProfile) -> ProviderResult<Profile> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable {
                service: "profile",
                message: "503 Service Unavailable".to_string(),
            });
        }
        self.created.lock().unwrap().push(profile.clone());
        Ok(Profile {
            id: profile.id.clone(),
            name: Some(profile.name.clone()),
            picture: profile.picture.clone(),
        })
    }
}

/// Account store whose id lookups keep returning a frozen snapshot, as if
/// every reader loaded the row before any writer committed.
struct StaleReads {
    inner: Arc<MemoryAccountStore>,
    frozen: Mutex<Option<Account>>,
}

impl StaleReads {
    fn new(inner: Arc<MemoryAccountStore>) -> Self {
        Self {
            inner,
            frozen: Mutex::new(None),
        }
    }

    async fn freeze(&self, id: Uuid) {
        let snapshot = self.inner.find_by_id(id).await.unwrap();
        *self.frozen.lock().unwrap() = snapshot;
    }
}

#[async_trait]
impl AccountStore for StaleReads {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let frozen = self.frozen.lock().unwrap().clone();
        match frozen {
            Some(account) if account.id == id => Ok(Some(account)),
            _ => self.inner.find_by_id(id).await,
        }
    }

    async fn find_by_subject(&self, subject: &str) -> StoreResult<Option<Account>> {
        self.inner.find_by_subject(subject).await
    }

    async fn find_by_subject_and_provider(
        &self,
        subject: &str,
        provider: FederationProvider,
    ) -> StoreResult<Option<Account>> {
        self.inner
            .find_by_subject_and_provider(subject, provider)
            .await
    }

    async fn find_by_phone(&self, phone_number: &str) -> StoreResult<Option<Account>> {
        self.inner.find_by_phone(phone_number).await
    }

    async fn find_by_id_and_refresh_token(
        &self,
        id: Uuid,
        refresh_token: &str,
    ) -> StoreResult<Option<Account>> {
        self.inner.find_by_id_and_refresh_token(id, refresh_token).await
    }

    async fn insert(&self, account: &Account) -> StoreResult<()> {
        self.inner.insert(account).await
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        self.inner.update(account).await
    }

    async fn rotate_refresh_token(&self, account: &Account, expected: &str) -> StoreResult<bool> {
        self.inner.rotate_refresh_token(account, expected).await
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.soft_delete(id).await
    }
}

struct FixedCode;

impl CodeGenerator for FixedCode {
    fn generate(&self) -> String {
        CODE.to_string()
    }
}

struct TestFixture {
    auth: AuthService,
    accounts: Arc<MemoryAccountStore>,
    identity: Arc<FakeIdentity>,
    messaging: Arc<FakeMessaging>,
    profiles: Arc<FakeProfiles>,
}

impl TestFixture {
    fn new() -> Self {
        let accounts = Arc::new(MemoryAccountStore::new());
        Self::with_store(accounts.clone(), accounts)
    }

    /// Build a fixture whose service talks to `store`, which must be backed by `accounts`.
    fn with_store(accounts: Arc<MemoryAccountStore>, store: Arc<dyn AccountStore>) -> Self {
        let identity = Arc::new(FakeIdentity::default());
        let messaging = Arc::new(FakeMessaging::default());
        let profiles = Arc::new(FakeProfiles::default());

        identity.issue("google-token", "uid-abc", "google.com");
        identity.issue("facebook-token", "uid-abc", "facebook.com");

        let auth = AuthService::new(
            AuthConfig::default(),
            Arc::new(MemoryCacheStore::new()),
            store,
            identity.clone(),
            messaging.clone(),
            profiles.clone(),
        )
        .unwrap()
        .with_code_generator(Arc::new(FixedCode));

        Self {
            auth,
            accounts,
            identity,
            messaging,
            profiles,
        }
    }
}

// ============================================================================
// Federated sign-up and sign-in
// ============================================================================

#[tokio::test]
async fn test_sign_up_creates_standard_federated_account() {
    let fixture = TestFixture::new();

    let account = fixture.auth.sign_up("google-token").await.unwrap();
    assert_eq!(account.subject.as_deref(), Some("uid-abc"));
    assert_eq!(account.role, Role::User);
    assert_eq!(account.origin, IdentityOrigin::Federated);
    assert_eq!(account.provider, FederationProvider::Google);
    assert_eq!(account.email.as_deref(), Some("uid-abc@example.com"));

    let created = fixture.profiles.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].id, account.id.to_string());
    assert_eq!(created[0].name, "Ana Nguyen");
}

#[tokio::test]
async fn test_duplicate_sign_up_conflicts() {
    let fixture = TestFixture::new();

    fixture.auth.sign_up("google-token").await.unwrap();
    let second = fixture.auth.sign_up("google-token").await;

    assert!(matches!(second, Err(AuthError::Conflict(_))));
    assert_eq!(fixture.accounts.len().await, 1);
    assert_eq!(fixture.profiles.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sign_up_aborts_when_profile_provisioning_fails() {
    let fixture = TestFixture::new();
    fixture.profiles.down.store(true, Ordering::SeqCst);

    let result = fixture.auth.sign_up("google-token").await;

    assert!(matches!(result, Err(AuthError::ProviderUnavailable(_))));
    assert!(fixture.accounts.is_empty().await);
}

#[tokio::test]
async fn test_sign_up_conflict_after_provisioning() {
    let fixture = TestFixture::new();
    fixture
        .accounts
        .insert(&Account::phone("0900000000").with_email("uid-abc@example.com", true))
        .await
        .unwrap();

    let result = fixture.auth.sign_up("google-token").await;

    assert!(matches!(result, Err(AuthError::Conflict(_))));
    // The profile was created before the local insert lost on email.
    assert_eq!(fixture.profiles.created.lock().unwrap().len(), 1);
    assert_eq!(fixture.accounts.len().await, 1);
    assert!(fixture.accounts.find_by_subject("uid-abc").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_with_invalid_token() {
    let fixture = TestFixture::new();

    let result = fixture.auth.sign_up("forged-token").await;

    assert!(matches!(result, Err(AuthError::InvalidCredential(_))));
    assert!(fixture.accounts.is_empty().await);
}

#[tokio::test]
async fn test_federated_sign_in_is_keyed_by_subject_and_provider() {
    let fixture = TestFixture::new();
    fixture.auth.sign_up("google-token").await.unwrap();

    let session = fixture.auth.sign_in_federated("google-token").await.unwrap();
    assert!(!session.is_new_account);
    assert_eq!(session.tokens.token_type, "Bearer");
    assert!(session.account.last_login_at.is_some());

    let other_provider = fixture.auth.sign_in_federated("facebook-token").await;
    assert!(matches!(other_provider, Err(AuthError::NotFound(_))));
}

#[tokio::test]
async fn test_sign_in_before_sign_up_is_not_found() {
    let fixture = TestFixture::new();

    let result = fixture.auth.sign_in_federated("google-token").await;
    assert!(matches!(result, Err(AuthError::NotFound(_))));
}

#[tokio::test]
async fn test_sign_in_persists_refresh_token() {
    let fixture = TestFixture::new();
    fixture.auth.sign_up("google-token").await.unwrap();

    let session = fixture.auth.sign_in_federated("google-token").await.unwrap();
    let stored = fixture
        .accounts
        .find_by_id_and_refresh_token(session.account.id, &session.tokens.refresh_token)
        .await
        .unwrap();

    assert!(stored.is_some());
    assert_eq!(stored.unwrap().id_token.as_deref(), Some("google-token"));
}

// ============================================================================
// Phone OTP
// ============================================================================

#[tokio::test]
async fn test_otp_scenario() {
    let fixture = TestFixture::new();

    let issued = fixture.auth.request_otp(PHONE).await.unwrap();
    assert_eq!(issued.remaining_attempts, 3);
    assert_eq!(issued.expires_in_secs, 120);
    assert_eq!(
        fixture.messaging.sent.lock().unwrap().as_slice(),
        &[(PHONE.to_string(), CODE.to_string())]
    );

    assert!(fixture.auth.verify_otp(PHONE, CODE).await.unwrap());
    assert!(!fixture.auth.verify_otp(PHONE, CODE).await.unwrap());
}

#[tokio::test]
async fn test_fifth_otp_request_is_rate_limited() {
    let fixture = TestFixture::new();

    for _ in 0..4 {
        fixture.auth.request_otp(PHONE).await.unwrap();
    }
    let fifth = fixture.auth.request_otp(PHONE).await;

    match fifth {
        Err(AuthError::RateLimited { max_attempts, .. }) => assert_eq!(max_attempts, 4),
        other => panic!("expected RateLimited, got {:?}", other),
    }
    assert_eq!(fixture.messaging.sent.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_first_otp_sign_in_provisions_account() {
    let fixture = TestFixture::new();

    let first = fixture.auth.sign_in_otp(PHONE).await.unwrap();
    assert!(first.is_new_account);
    assert_eq!(first.account.phone_number.as_deref(), Some(PHONE));
    assert!(first.account.phone_verified);
    assert!(first.account.email.is_none());
    assert_eq!(first.account.role, Role::User);
    assert_eq!(first.account.origin, IdentityOrigin::PhoneOtp);
    assert_eq!(first.account.provider, FederationProvider::SmsZalo);

    let created = fixture.profiles.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "Zalo User-0901234567");

    let second = fixture.auth.sign_in_otp(PHONE).await.unwrap();
    assert!(!second.is_new_account);
    assert_eq!(second.account.id, first.account.id);
    assert_eq!(fixture.profiles.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_otp_sign_in_refuses_federated_phone() {
    let fixture = TestFixture::new();
    fixture
        .identity
        .issue_with_phone("phone-token", "uid-phone", "google.com", PHONE);

    let account = fixture.auth.sign_up("phone-token").await.unwrap();
    assert_eq!(account.phone_number.as_deref(), Some(PHONE));
    assert!(account.phone_verified);

    let result = fixture.auth.sign_in_otp(PHONE).await;

    assert!(matches!(result, Err(AuthError::InvalidCredential(_))));
    assert_eq!(fixture.accounts.len().await, 1);
    assert_eq!(fixture.profiles.created.lock().unwrap().len(), 1);

    let stored = fixture.accounts.find_by_id(account.id).await.unwrap().unwrap();
    assert_eq!(stored.origin, IdentityOrigin::Federated);
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_otp_sign_in_fails_without_profile() {
    let fixture = TestFixture::new();
    fixture.profiles.down.store(true, Ordering::SeqCst);

    let result = fixture.auth.sign_in_otp(PHONE).await;

    assert!(matches!(result, Err(AuthError::ProviderUnavailable(_))));
    assert!(fixture.accounts.is_empty().await);
}

#[tokio::test]
async fn test_sign_in_with_code() {
    let fixture = TestFixture::new();
    fixture.auth.request_otp(PHONE).await.unwrap();

    let wrong = fixture.auth.sign_in_with_code(PHONE, "111111").await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredential(_))));
    assert!(fixture.accounts.is_empty().await);

    let session = fixture.auth.sign_in_with_code(PHONE, CODE).await.unwrap();
    assert!(session.is_new_account);

    let replay = fixture.auth.sign_in_with_code(PHONE, CODE).await;
    assert!(matches!(replay, Err(AuthError::InvalidCredential(_))));
}

#[tokio::test]
async fn test_malformed_phone_is_rejected() {
    let fixture = TestFixture::new();

    assert!(matches!(
        fixture.auth.request_otp("09-01").await,
        Err(AuthError::Validation(_))
    ));
    assert!(matches!(
        fixture.auth.sign_in_otp("not-a-phone").await,
        Err(AuthError::Validation(_))
    ));
    assert!(fixture.messaging.sent.lock().unwrap().is_empty());
}

// ============================================================================
// Token validation, refresh and sign-out
// ============================================================================

#[tokio::test]
async fn test_validate_access_token() {
    let fixture = TestFixture::new();
    fixture.auth.sign_up("google-token").await.unwrap();
    let session = fixture.auth.sign_in_federated("google-token").await.unwrap();

    let validation = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await
        .unwrap();

    assert_eq!(validation.account_id, session.account.id);
    assert_eq!(validation.subject.as_deref(), Some("uid-abc"));
    assert!(validation.account_exists);
    assert_eq!(validation.role, Some(Role::User));
    assert_eq!(validation.provider, Some(FederationProvider::Google));
    assert_eq!(validation.context.account_id, session.account.id);
    assert!(validation.expires_at > validation.issued_at);
}

#[tokio::test]
async fn test_tokens_cannot_stand_in_for_each_other() {
    let fixture = TestFixture::new();
    let session = fixture.auth.sign_in_otp(PHONE).await.unwrap();

    let refresh_as_access = fixture
        .auth
        .validate_token(&session.tokens.refresh_token, TokenPurpose::Access)
        .await;
    assert!(matches!(refresh_as_access, Err(AuthError::InvalidCredential(_))));

    let access_as_refresh = fixture.auth.refresh(&session.tokens.access_token).await;
    assert!(matches!(access_as_refresh, Err(AuthError::InvalidCredential(_))));
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let fixture = TestFixture::new();
    let session = fixture.auth.sign_in_otp(PHONE).await.unwrap();

    let refreshed = fixture.auth.refresh(&session.tokens.refresh_token).await.unwrap();
    assert_ne!(refreshed.tokens.refresh_token, session.tokens.refresh_token);

    let reuse = fixture.auth.refresh(&session.tokens.refresh_token).await;
    assert!(matches!(reuse, Err(AuthError::Unauthorized(_))));

    let stale = fixture
        .auth
        .validate_token(&session.tokens.refresh_token, TokenPurpose::Refresh)
        .await;
    assert!(matches!(stale, Err(AuthError::Unauthorized(_))));

    let current = fixture
        .auth
        .validate_token(&refreshed.tokens.refresh_token, TokenPurpose::Refresh)
        .await
        .unwrap();
    assert!(current.account_exists);

    // The refreshed access token superseded the original one.
    let old_access = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await;
    assert!(matches!(old_access, Err(AuthError::Unauthorized(_))));
    assert!(fixture
        .auth
        .validate_token(&refreshed.tokens.access_token, TokenPurpose::Access)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_concurrent_refreshes_yield_one_pair() {
    let fixture = TestFixture::new();
    let session = fixture.auth.sign_in_otp(PHONE).await.unwrap();
    let token = session.tokens.refresh_token.clone();

    let (a, b, c) = tokio::join!(
        fixture.auth.refresh(&token),
        fixture.auth.refresh(&token),
        fixture.auth.refresh(&token),
    );
    let results = [a, b, c];

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn test_refresh_with_stale_read_is_unauthorized() {
    let accounts = Arc::new(MemoryAccountStore::new());
    let stale = Arc::new(StaleReads::new(accounts.clone()));
    let fixture = TestFixture::with_store(accounts, stale.clone());

    let session = fixture.auth.sign_in_otp(PHONE).await.unwrap();
    stale.freeze(session.account.id).await;

    // Both refreshes read the account while it still holds the original token.
    let first = fixture
        .auth
        .refresh(&session.tokens.refresh_token)
        .await
        .unwrap();
    let second = fixture.auth.refresh(&session.tokens.refresh_token).await;
    assert!(matches!(second, Err(AuthError::Unauthorized(_))));

    let stored = fixture
        .accounts
        .find_by_id(session.account.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.refresh_token_matches(&first.tokens.refresh_token));
    assert!(fixture
        .auth
        .validate_token(&first.tokens.access_token, TokenPurpose::Access)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_newer_sign_in_supersedes_older_session() {
    let fixture = TestFixture::new();
    fixture.auth.sign_up("google-token").await.unwrap();

    let first = fixture.auth.sign_in_federated("google-token").await.unwrap();
    let second = fixture.auth.sign_in_federated("google-token").await.unwrap();

    let stale = fixture
        .auth
        .validate_token(&first.tokens.access_token, TokenPurpose::Access)
        .await;
    assert!(matches!(stale, Err(AuthError::Unauthorized(_))));
    assert!(fixture
        .auth
        .validate_token(&second.tokens.access_token, TokenPurpose::Access)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_sign_out_invalidates_tokens_immediately() {
    let fixture = TestFixture::new();
    fixture.auth.sign_up("google-token").await.unwrap();
    let session = fixture.auth.sign_in_federated("google-token").await.unwrap();

    let validation = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await
        .unwrap();
    fixture.auth.sign_out(&validation.context).await.unwrap();

    // Still signature-valid, but no longer whitelisted.
    assert!(fixture
        .auth
        .tokens()
        .verify(&session.tokens.access_token, TokenPurpose::Access)
        .is_ok());
    assert!(!fixture
        .auth
        .sessions()
        .is_valid(session.account.id, &session.tokens.access_token)
        .await
        .unwrap());

    let access = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await;
    assert!(matches!(access, Err(AuthError::Unauthorized(_))));

    let refresh = fixture.auth.refresh(&session.tokens.refresh_token).await;
    assert!(matches!(refresh, Err(AuthError::Unauthorized(_))));

    assert_eq!(
        fixture.identity.revoked.lock().unwrap().as_slice(),
        &["uid-abc".to_string()]
    );

    let stored = fixture.accounts.find_by_id(session.account.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
    assert!(stored.id_token.is_none());
}

#[tokio::test]
async fn test_sign_out_survives_provider_revoke_failure() {
    let fixture = TestFixture::new();
    fixture.identity.fail_revoke.store(true, Ordering::SeqCst);
    fixture.auth.sign_up("google-token").await.unwrap();
    let session = fixture.auth.sign_in_federated("google-token").await.unwrap();

    let validation = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await
        .unwrap();

    fixture.auth.sign_out(&validation.context).await.unwrap();

    let access = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await;
    assert!(matches!(access, Err(AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn test_phone_account_sign_out_skips_identity_provider() {
    let fixture = TestFixture::new();
    let session = fixture.auth.sign_in_otp(PHONE).await.unwrap();

    let validation = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await
        .unwrap();
    assert!(validation.subject.is_none());

    fixture.auth.sign_out(&validation.context).await.unwrap();

    assert!(fixture.identity.revoked.lock().unwrap().is_empty());
    let refresh = fixture.auth.refresh(&session.tokens.refresh_token).await;
    assert!(matches!(refresh, Err(AuthError::Unauthorized(_))));
}

#[tokio::test(start_paused = true)]
async fn test_whitelist_entry_expires_with_access_lifetime() {
    let fixture = TestFixture::new();
    let session = fixture.auth.sign_in_otp(PHONE).await.unwrap();

    tokio::time::advance(Duration::from_secs(3599)).await;
    assert!(fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await
        .is_ok());

    tokio::time::advance(Duration::from_secs(2)).await;
    let expired = fixture
        .auth
        .validate_token(&session.tokens.access_token, TokenPurpose::Access)
        .await;
    assert!(matches!(expired, Err(AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new();
    assert!(fixture.auth.health_check().await.is_ok());
}
