//! Audit Event Entity
//!
//! Immutable records of security-relevant occurrences. Retention is a
//! bounded ring owned by the audit store; this module only defines the
//! event shape and the query filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

/// Kind of security event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    AuthSuccess,
    AuthFailure,
    Lockout,
    ManualLock,
    ManualUnlock,
    SessionInvalid,
    Logout,
    AdminDenied,
}

impl AuditKind {
    pub const ALL: [AuditKind; 8] = [
        AuditKind::AuthSuccess,
        AuditKind::AuthFailure,
        AuditKind::Lockout,
        AuditKind::ManualLock,
        AuditKind::ManualUnlock,
        AuditKind::SessionInvalid,
        AuditKind::Logout,
        AuditKind::AdminDenied,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditKind::AuthSuccess => "AUTH_SUCCESS",
            AuditKind::AuthFailure => "AUTH_FAILURE",
            AuditKind::Lockout => "LOCKOUT",
            AuditKind::ManualLock => "MANUAL_LOCK",
            AuditKind::ManualUnlock => "MANUAL_UNLOCK",
            AuditKind::SessionInvalid => "SESSION_INVALID",
            AuditKind::Logout => "LOGOUT",
            AuditKind::AdminDenied => "ADMIN_DENIED",
        }
    }
}

impl FromStr for AuditKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One security event. Immutable once appended.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub source_addr: IpAddr,
    pub at: DateTime<Utc>,
    /// Free-form key/value context (reason, session id, lock expiry, ...)
    pub detail: serde_json::Value,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, source_addr: IpAddr) -> Self {
        Self {
            kind,
            source_addr,
            at: Utc::now(),
            detail: serde_json::Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// Conjunction filter for audit queries; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub kind: Option<AuditKind>,
    pub addr: Option<IpAddr>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if self.kind.is_some_and(|kind| kind != event.kind) {
            return false;
        }
        if self.addr.is_some_and(|addr| addr != event.source_addr) {
            return false;
        }
        if self.start.is_some_and(|start| event.at < start) {
            return false;
        }
        if self.end.is_some_and(|end| event.at > end) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in AuditKind::ALL {
            assert_eq!(kind.as_str().parse::<AuditKind>(), Ok(kind));
        }
        assert!("NOT_A_KIND".parse::<AuditKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&AuditKind::AuthFailure).unwrap();
        assert_eq!(json, "\"AUTH_FAILURE\"");
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let event = AuditEvent::new(AuditKind::Logout, addr("10.0.0.1"));
        assert!(AuditFilter::default().matches(&event));
    }

    #[test]
    fn test_filter_conjunction() {
        let event = AuditEvent::new(AuditKind::AuthFailure, addr("10.0.0.5"));

        let mut filter = AuditFilter {
            kind: Some(AuditKind::AuthFailure),
            addr: Some(addr("10.0.0.5")),
            ..Default::default()
        };
        assert!(filter.matches(&event));

        filter.addr = Some(addr("10.0.0.6"));
        assert!(!filter.matches(&event));

        filter.addr = Some(addr("10.0.0.5"));
        filter.kind = Some(AuditKind::AuthSuccess);
        assert!(!filter.matches(&event));
    }

    #[test]
    fn test_filter_time_bounds() {
        let event = AuditEvent::new(AuditKind::Lockout, addr("10.0.0.5"));

        let filter = AuditFilter {
            start: Some(event.at - chrono::Duration::seconds(1)),
            end: Some(event.at + chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(filter.matches(&event));

        let filter = AuditFilter {
            start: Some(event.at + chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!filter.matches(&event));

        let filter = AuditFilter {
            end: Some(event.at - chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!filter.matches(&event));
    }
}
