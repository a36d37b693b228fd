//! Agent gateway library
//!
//! Authenticates agents by hashed `lc_` API key and reports per-IP
//! sliding-window rate limit consumption.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use auth::{AuthOutcome, Authenticator, Identity};
pub use config::Settings;
pub use error::ApiError;
pub use server::App;
