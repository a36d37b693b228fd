//! Utility modules

pub mod ip;

pub use ip::{client_ip, mask_ip_digits, UNKNOWN_IP};
