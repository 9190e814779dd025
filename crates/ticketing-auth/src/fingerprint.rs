//! Short digests for correlating secrets in logs.

use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 12;

/// Fingerprint a secret value (token, code) for logging.
///
/// The first 12 hex characters of its SHA-256 digest. Stable across calls,
/// so two log lines about the same token can be matched.
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let hash = hasher.finalize();

    let mut out = String::with_capacity(FINGERPRINT_LEN);
    for byte in hash.iter().take(FINGERPRINT_LEN / 2) {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
