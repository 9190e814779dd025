//! # Ticketing Providers
//!
//! HTTP clients for the external services the ticketing auth core depends on.
//!
//! ## Overview
//!
//! - **Identity**: Verify federated identity tokens, revoke provider sessions
//! - **Messaging**: Template OTP delivery with access-token refresh
//! - **Profile**: Create, read, update and delete public profile records
//!
//! Every client carries a bounded request timeout. A timeout, network failure
//! or 5xx answer surfaces as [`ProviderError::Unavailable`]; a 4xx answer as
//! [`ProviderError::Rejected`]. No call is retried automatically.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ticketing_providers::{identity, ProviderConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProviderConfig::from_env();
//!
//!     // One identity client per process, injected where needed.
//!     let identity = identity::initialize(&config)?;
//!     let decoded = identity.verify_token("raw-id-token").await?;
//!     println!("verified {}", decoded.uid);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod messaging;
pub mod profile;

pub use config::{ConfigError, Endpoint, MessagingConfig, ProviderConfig};
pub use error::{ProviderError, ProviderResult};
pub use identity::{DecodedIdToken, IdentityClient};
pub use messaging::{DispatchReceipt, MessagingClient};
pub use profile::{NewProfile, Profile, ProfileClient, ProfileUpdate};
