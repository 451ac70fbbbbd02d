//! Client identification utilities
//!
//! The source address is the identity anchor for rate limiting, lockout
//! and session pinning, so every inbound request must resolve to exactly
//! one `IpAddr` before it reaches the gate.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Extract the client source address from request headers
///
/// Checks the X-Forwarded-For header first (for reverse proxy setups)
/// and takes its first entry, then falls back to the direct connection
/// address.
///
/// Note: X-Forwarded-For is client-controlled unless a trusted proxy
/// strips and rewrites it. Deployments not behind such a proxy should
/// rely on the direct address only.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
///
/// ## Returns
/// The client IP address, or None if not determinable
pub fn extract_source_addr(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_source_addr_xff() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let ip = extract_source_addr(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_source_addr_direct() {
        let headers = HeaderMap::new();
        let direct: IpAddr = "127.0.0.1".parse().unwrap();

        let ip = extract_source_addr(&headers, Some(direct));
        assert_eq!(ip, Some(direct));
    }

    #[test]
    fn test_extract_source_addr_malformed_xff_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let direct: IpAddr = "10.0.0.5".parse().unwrap();

        let ip = extract_source_addr(&headers, Some(direct));
        assert_eq!(ip, Some(direct));
    }

    #[test]
    fn test_extract_source_addr_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_source_addr(&headers, None), None);
    }
}
