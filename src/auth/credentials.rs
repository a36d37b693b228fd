//! API key format, hashing and minting
//!
//! Keys look like `lc_<64 hex chars>`. The full string, prefix included,
//! is what gets hashed and stored.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Literal prefix every API key carries
pub const API_KEY_PREFIX: &str = "lc_";

/// Authorization scheme accepted for API keys
pub const BEARER_SCHEME: &str = "Bearer";

/// Number of random bytes in a minted key
const KEY_BYTES: usize = 32;

/// Number of hash characters shown in logs
const FINGERPRINT_LEN: usize = 12;

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two whitespace-separated parts and the first
/// must be the literal `Bearer`.
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;

    if scheme != BEARER_SCHEME || parts.next().is_some() {
        return None;
    }
    Some(token)
}

/// Whether `token` has the `lc_` prefix followed by at least one character
pub fn is_api_key(token: &str) -> bool {
    token
        .strip_prefix(API_KEY_PREFIX)
        .is_some_and(|secret| !secret.is_empty())
}

/// Parse an `Authorization` header value into an `lc_` API key
pub fn parse_api_key_header(header_value: &str) -> Option<&str> {
    parse_bearer(header_value).filter(|token| is_api_key(token))
}

/// SHA-256 hex digest of a full API key
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mint a new API key. Returns `(raw_key, hashed_key)`.
pub fn generate_api_key() -> (String, String) {
    let mut bytes = [0u8; KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let raw = format!("{API_KEY_PREFIX}{}", hex::encode(bytes));
    let hashed = hash_api_key(&raw);
    (raw, hashed)
}

/// Short prefix of a hashed key, safe to put in logs
pub fn fingerprint(hashed_key: &str) -> &str {
    hashed_key.get(..FINGERPRINT_LEN).unwrap_or(hashed_key)
}
