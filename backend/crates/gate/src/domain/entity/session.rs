//! Session Entity
//!
//! A session credential issued after successful password verification,
//! pinned to the source address it was issued to.

use chrono::{DateTime, Duration, Utc};
use std::net::IpAddr;
use uuid::Uuid;

/// Authenticated session
///
/// The `token_id` is the opaque lookup key carried (signed) on the wire;
/// `session_id` is a separate correlation id safe to put in logs and
/// audit details, so the raw credential never leaves the store.
#[derive(Debug, Clone)]
pub struct Session {
    /// Correlation ID for logs and audit events (UUID v4)
    pub session_id: Uuid,
    /// Opaque token identifier (URL-safe base64 of 32 CSPRNG bytes)
    pub token_id: String,
    /// Source address the session is pinned to
    pub issued_to: IpAddr,
    /// Issue timestamp
    pub issued_at: DateTime<Utc>,
    /// Session expiration (Unix timestamp ms)
    pub expires_at_ms: i64,
    /// Last successful validation
    pub last_validated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(token_id: String, issued_to: IpAddr, ttl: std::time::Duration) -> Self {
        let now = Utc::now();
        let ttl = Duration::milliseconds(ttl.as_millis() as i64);

        Self {
            session_id: Uuid::new_v4(),
            token_id,
            issued_to,
            issued_at: now,
            expires_at_ms: (now + ttl).timestamp_millis(),
            last_validated_at: now,
        }
    }

    /// Check if session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() >= self.expires_at_ms
    }

    /// Whether the given source address matches the pinned one
    pub fn is_pinned_to(&self, addr: IpAddr) -> bool {
        self.issued_to == addr
    }

    /// Update last validation timestamp
    pub fn touch(&mut self) {
        self.last_validated_at = Utc::now();
    }

    /// Get remaining time until expiration
    pub fn remaining_ms(&self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        (self.expires_at_ms - now_ms).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn addr() -> IpAddr {
        "10.0.0.9".parse().unwrap()
    }

    #[test]
    fn test_new_session_is_valid() {
        let session = Session::new("token-id".into(), addr(), StdDuration::from_secs(3600));
        assert!(!session.is_expired());
        assert!(session.remaining_ms() > 0);
        assert!(session.is_pinned_to(addr()));
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let session = Session::new("token-id".into(), addr(), StdDuration::ZERO);
        assert!(session.is_expired());
        assert_eq!(session.remaining_ms(), 0);
    }

    #[test]
    fn test_address_pinning() {
        let session = Session::new("token-id".into(), addr(), StdDuration::from_secs(3600));
        let other: IpAddr = "10.0.0.10".parse().unwrap();
        assert!(!session.is_pinned_to(other));
    }

    #[test]
    fn test_touch_moves_forward() {
        let mut session = Session::new("token-id".into(), addr(), StdDuration::from_secs(3600));
        let before = session.last_validated_at;
        std::thread::sleep(StdDuration::from_millis(2));
        session.touch();
        assert!(session.last_validated_at > before);
    }
}
