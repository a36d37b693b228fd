//! Client IP helpers

use axum::http::HeaderMap;

/// Value reported when no client IP header is present
pub const UNKNOWN_IP: &str = "unknown";

/// Derive the client IP from proxy headers.
///
/// Uses the first entry of `X-Forwarded-For` when it is non-empty after
/// trimming, then `X-Real-IP`, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

/// Replace every ASCII digit with `*`, keeping all other characters.
///
/// This is a display mask, not a hash.
pub fn mask_ip_digits(ip: &str) -> String {
    ip.chars()
        .map(|c| if c.is_ascii_digit() { '*' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4, 5.6.7.8")]);
        assert_eq!(client_ip(&h), "1.2.3.4");
    }

    #[test]
    fn test_forwarded_for_wins_over_real_ip() {
        let h = headers(&[("x-forwarded-for", " 10.0.0.1 "), ("x-real-ip", "9.9.9.9")]);
        assert_eq!(client_ip(&h), "10.0.0.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let h = headers(&[("x-real-ip", "9.9.9.9")]);
        assert_eq!(client_ip(&h), "9.9.9.9");

        // Blank first forwarded entry falls through
        let h = headers(&[("x-forwarded-for", " , 5.6.7.8"), ("x-real-ip", "9.9.9.9")]);
        assert_eq!(client_ip(&h), "9.9.9.9");
    }

    #[test]
    fn test_unknown_when_absent() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
        let h = headers(&[("x-forwarded-for", ""), ("x-real-ip", "  ")]);
        assert_eq!(client_ip(&h), "unknown");
    }

    #[test]
    fn test_mask_ip_digits() {
        assert_eq!(mask_ip_digits("203.0.113.7"), "***.*.***.*");
        assert_eq!(mask_ip_digits("unknown"), "unknown");
        assert_eq!(mask_ip_digits("2001:db8::1"), "****:db*::*");
    }
}
