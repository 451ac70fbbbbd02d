//! Repository Traits
//!
//! Interfaces for gate state. The in-memory implementation lives in the
//! infrastructure layer; every read-modify-write on a per-address or
//! per-token entry must be atomic inside the implementation.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;

use crate::domain::entity::attempt_record::LockState;
use crate::domain::entity::audit_event::{AuditEvent, AuditFilter, AuditKind};
use crate::domain::entity::session::Session;
use crate::error::GateResult;

/// Aggregate counters over the attempt table
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptStats {
    /// Addresses with a live attempt record
    pub tracked: u64,
    /// Addresses currently locked out
    pub locked: u64,
}

/// Failed-attempt / lockout repository trait
#[trait_variant::make(AttemptRepository: Send)]
pub trait LocalAttemptRepository {
    /// Side-effect-free lock state lookup
    async fn lock_state(&self, addr: IpAddr) -> GateResult<LockState>;

    /// Count one failure, locking the address if the threshold is hit
    async fn record_failure(&self, addr: IpAddr) -> GateResult<LockState>;

    /// Clear the attempt record after a successful authentication
    async fn record_success(&self, addr: IpAddr) -> GateResult<()>;

    /// Lock an address directly, returning the lock expiry
    async fn manual_lock(&self, addr: IpAddr, duration: Duration) -> GateResult<DateTime<Utc>>;

    /// Clear any lock; returns whether a lock was in effect
    async fn manual_unlock(&self, addr: IpAddr) -> GateResult<bool>;

    /// Drop stale, unlocked records; returns how many were removed
    async fn sweep_stale(&self) -> GateResult<u64>;

    /// Aggregate counters
    async fn attempt_stats(&self) -> GateResult<AttemptStats>;
}

/// Session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Store a freshly issued session
    async fn create(&self, session: &Session) -> GateResult<()>;

    /// Find a session by token id
    async fn find(&self, token_id: &str) -> GateResult<Option<Session>>;

    /// Update last validation time
    async fn touch(&self, token_id: &str, at: DateTime<Utc>) -> GateResult<()>;

    /// Remove a session eagerly; returns whether it existed
    async fn delete(&self, token_id: &str) -> GateResult<bool>;

    /// Remove expired sessions; returns how many were removed
    async fn sweep_expired(&self) -> GateResult<u64>;

    /// Number of stored sessions (including not-yet-swept expired ones)
    async fn session_count(&self) -> GateResult<u64>;
}

/// Audit log repository trait
#[trait_variant::make(AuditRepository: Send)]
pub trait LocalAuditRepository {
    /// Append one event; when full the oldest event is evicted
    async fn append(&self, event: AuditEvent) -> GateResult<()>;

    /// Query events, most recent first, capped by `limit`
    async fn query(&self, limit: usize, filter: &AuditFilter) -> GateResult<Vec<AuditEvent>>;

    /// Number of retained events
    async fn audit_len(&self) -> GateResult<u64>;

    /// Retained-event count per kind
    async fn count_by_kind(&self) -> GateResult<Vec<(AuditKind, u64)>>;
}
