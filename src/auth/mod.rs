//! Agent authentication
//!
//! API keys are presented as `Authorization: Bearer lc_<secret>` (or via
//! `x-api-key`) and matched against their stored SHA-256 digest.

pub mod authenticator;
pub mod credentials;

pub use authenticator::{AuthMethod, AuthOutcome, Authenticator, Identity, API_KEY_HEADER};
pub use credentials::{generate_api_key, hash_api_key, parse_api_key_header, API_KEY_PREFIX};
