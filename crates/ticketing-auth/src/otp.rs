//! Phone OTP engine
//!
//! Issues 6-digit codes through the messaging provider, stores them with a
//! short TTL and enforces a per-phone request quota. The quota window starts
//! at the first request and only resets when it expires.

use crate::error::{AuthError, AuthResult};
use crate::fingerprint::fingerprint;
use crate::providers::OtpDispatcher;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use ticketing_cache::{CacheStore, KeyTtl};
use tracing::{info, warn};

/// Number of digits in a code.
pub const OTP_LENGTH: usize = 6;

const OTP_KEY_PREFIX: &str = "otp";
const RATE_LIMIT_KEY_PREFIX: &str = "otp_rate_limit";

/// Source of OTP codes.
pub trait CodeGenerator: Send + Sync {
    /// Produce a fresh 6-digit code.
    fn generate(&self) -> String;
}

/// Uniformly random codes in `100000..=999999`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }
}

/// Result of a successful OTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpIssued {
    /// Requests left in the current window.
    pub remaining_attempts: u32,

    /// Lifetime of the issued code.
    pub expires_in_secs: u64,

    /// Requests allowed per window.
    pub max_attempts: u32,
}

/// Quota and lifetime settings for the engine.
#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    /// Code lifetime.
    pub ttl: Duration,

    /// Requests allowed per window.
    pub max_requests: u32,

    /// Quota window, measured from the first request.
    pub window: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            max_requests: 4,
            window: Duration::from_secs(24 * 3600),
        }
    }
}

/// Check that `phone` is 9 to 15 digits with an optional leading `+`.
pub fn validate_phone(phone: &str) -> AuthResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let valid = (9..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "phone number must be 9-15 digits with an optional leading +".to_string(),
        ))
    }
}

fn is_well_formed_code(candidate: &str) -> bool {
    candidate.len() == OTP_LENGTH && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// Issues and verifies one-time passcodes.
#[derive(Clone)]
pub struct OtpEngine {
    cache: Arc<dyn CacheStore>,
    dispatcher: Arc<dyn OtpDispatcher>,
    generator: Arc<dyn CodeGenerator>,
    policy: OtpPolicy,
}

impl std::fmt::Debug for OtpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpEngine")
            .field("policy", &self.policy)
            .finish()
    }
}

impl OtpEngine {
    /// Create an engine with random codes.
    pub fn new(
        cache: Arc<dyn CacheStore>,
        dispatcher: Arc<dyn OtpDispatcher>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            cache,
            dispatcher,
            generator: Arc::new(RandomCodeGenerator),
            policy,
        }
    }

    /// Replace the code generator.
    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Active policy.
    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    fn otp_key(phone: &str) -> String {
        format!("{}:{}", OTP_KEY_PREFIX, phone)
    }

    fn rate_limit_key(phone: &str) -> String {
        format!("{}:{}", RATE_LIMIT_KEY_PREFIX, phone)
    }

    async fn requests_in_window(&self, key: &str) -> AuthResult<u32> {
        match self.cache.get(key).await? {
            None => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| AuthError::internal("otp rate limit", format!("bad counter {:?}", raw))),
        }
    }

    /// Issue a code to `phone`.
    ///
    /// Fails with [`AuthError::RateLimited`] once the quota is spent and with
    /// [`AuthError::DeliveryFailed`] when the provider cannot deliver; in
    /// both cases nothing is stored.
    pub async fn request_otp(&self, phone: &str) -> AuthResult<OtpIssued> {
        validate_phone(phone)?;

        let max_attempts = self.policy.max_requests;
        let rate_key = Self::rate_limit_key(phone);

        let used = self.requests_in_window(&rate_key).await?;
        if used >= max_attempts {
            let retry_after_secs = match self.cache.ttl(&rate_key).await? {
                KeyTtl::Expires(remaining) => remaining.as_secs(),
                KeyTtl::Persistent | KeyTtl::Missing => self.policy.window.as_secs(),
            };
            let reset_at = Utc::now() + chrono::Duration::seconds(retry_after_secs as i64);
            warn!(phone = %phone, used, retry_after_secs, "OTP request quota exhausted");
            return Err(AuthError::RateLimited {
                max_attempts,
                retry_after_secs,
                reset_at,
            });
        }

        let code = self.generator.generate();

        let receipt = self.dispatcher.dispatch(phone, &code).await.map_err(|e| {
            warn!(phone = %phone, error = %e, "OTP delivery failed");
            AuthError::DeliveryFailed(e.to_string())
        })?;

        self.cache
            .set_ex(&Self::otp_key(phone), &code, self.policy.ttl)
            .await?;
        let count = self
            .cache
            .incr_within_window(&rate_key, self.policy.window)
            .await?;

        let remaining_attempts = i64::from(max_attempts).saturating_sub(count).max(0) as u32;

        info!(
            phone = %phone,
            code = %fingerprint(&code),
            tracking_id = %receipt.tracking_id,
            remaining_attempts,
            "OTP issued"
        );

        Ok(OtpIssued {
            remaining_attempts,
            expires_in_secs: self.policy.ttl.as_secs(),
            max_attempts,
        })
    }

    /// Check `candidate` against the live code for `phone`.
    ///
    /// A match consumes the code, so a given code verifies at most once even
    /// under concurrent attempts.
    pub async fn verify_otp(&self, phone: &str, candidate: &str) -> AuthResult<bool> {
        validate_phone(phone)?;

        if !is_well_formed_code(candidate) {
            info!(phone = %phone, "OTP candidate is not a 6-digit code");
            return Ok(false);
        }

        let matched = self
            .cache
            .compare_and_delete(&Self::otp_key(phone), candidate)
            .await?;

        if matched {
            info!(phone = %phone, "OTP verified");
        } else {
            warn!(phone = %phone, "OTP verification failed");
        }
        Ok(matched)
    }
}
