//! In-Memory Store
//!
//! Single-process state for attempts, sessions and the audit ring. One
//! mutex per table; every read-modify-write on an entry happens inside a
//! single lock acquisition, so concurrent failures for the same address
//! can never both observe the pre-increment count. No lock is held
//! across an await point.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::entity::attempt_record::{AttemptRecord, LockState, LockoutPolicy};
use crate::domain::entity::audit_event::{AuditEvent, AuditFilter, AuditKind};
use crate::domain::entity::session::Session;
use crate::domain::repository::{
    AttemptRepository, AttemptStats, AuditRepository, SessionRepository,
};
use crate::error::GateResult;

/// Bounded ring of audit events, oldest evicted first
struct AuditRing {
    capacity: usize,
    events: VecDeque<AuditEvent>,
}

impl AuditRing {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::new(),
        }
    }

    fn push(&mut self, event: AuditEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

struct Inner {
    policy: LockoutPolicy,
    attempts: Mutex<HashMap<IpAddr, AttemptRecord>>,
    sessions: Mutex<HashMap<String, Session>>,
    audit: Mutex<AuditRing>,
}

/// In-memory gate store
///
/// Cloning shares the underlying state; the process owns exactly one.
#[derive(Clone)]
pub struct MemoryGateStore {
    inner: Arc<Inner>,
}

impl MemoryGateStore {
    pub fn new(policy: LockoutPolicy, audit_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                attempts: Mutex::new(HashMap::new()),
                sessions: Mutex::new(HashMap::new()),
                audit: Mutex::new(AuditRing::new(audit_capacity)),
            }),
        }
    }

    // A poisoned table lock is recovered rather than surfaced: every
    // mutation is a single small update that either completed or was
    // never applied, so the data behind the guard stays usable.
    fn attempts(&self) -> MutexGuard<'_, HashMap<IpAddr, AttemptRecord>> {
        self.inner
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn audit(&self) -> MutexGuard<'_, AuditRing> {
        self.inner
            .audit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl AttemptRepository for MemoryGateStore {
    async fn lock_state(&self, addr: IpAddr) -> GateResult<LockState> {
        let now = Utc::now();
        let attempts = self.attempts();
        Ok(match attempts.get(&addr) {
            Some(record) => record.lock_state_at(now, &self.inner.policy),
            None => LockState::Open {
                remaining_attempts: self.inner.policy.threshold,
            },
        })
    }

    async fn record_failure(&self, addr: IpAddr) -> GateResult<LockState> {
        let now = Utc::now();
        let mut attempts = self.attempts();
        let record = attempts
            .entry(addr)
            .or_insert_with(|| AttemptRecord::new(now));
        Ok(record.record_failure_at(now, &self.inner.policy))
    }

    async fn record_success(&self, addr: IpAddr) -> GateResult<()> {
        self.attempts().remove(&addr);
        Ok(())
    }

    async fn manual_lock(&self, addr: IpAddr, duration: Duration) -> GateResult<DateTime<Utc>> {
        let now = Utc::now();
        let until = now + chrono::Duration::milliseconds(duration.as_millis() as i64);
        let mut attempts = self.attempts();
        attempts
            .entry(addr)
            .or_insert_with(|| AttemptRecord::new(now))
            .lock_until(until);
        Ok(until)
    }

    async fn manual_unlock(&self, addr: IpAddr) -> GateResult<bool> {
        let now = Utc::now();
        let mut attempts = self.attempts();
        match attempts.remove(&addr) {
            Some(record) => Ok(record.is_locked_at(now)),
            None => Ok(false),
        }
    }

    async fn sweep_stale(&self) -> GateResult<u64> {
        let now = Utc::now();
        let policy = self.inner.policy;

        // Snapshot stale keys, then remove them one lock acquisition at
        // a time. Each removal re-checks the entry: it may have been
        // refreshed by a failure since the snapshot.
        let candidates: Vec<IpAddr> = self
            .attempts()
            .iter()
            .filter(|(_, record)| record.is_stale_at(now, &policy))
            .map(|(addr, _)| *addr)
            .collect();

        let mut removed = 0u64;
        for addr in candidates {
            let mut attempts = self.attempts();
            if attempts
                .get(&addr)
                .is_some_and(|record| record.is_stale_at(now, &policy))
            {
                attempts.remove(&addr);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn attempt_stats(&self) -> GateResult<AttemptStats> {
        let now = Utc::now();
        let attempts = self.attempts();
        Ok(AttemptStats {
            tracked: attempts.len() as u64,
            locked: attempts
                .values()
                .filter(|record| record.is_locked_at(now))
                .count() as u64,
        })
    }
}

impl SessionRepository for MemoryGateStore {
    async fn create(&self, session: &Session) -> GateResult<()> {
        self.sessions()
            .insert(session.token_id.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, token_id: &str) -> GateResult<Option<Session>> {
        Ok(self.sessions().get(token_id).cloned())
    }

    async fn touch(&self, token_id: &str, at: DateTime<Utc>) -> GateResult<()> {
        if let Some(session) = self.sessions().get_mut(token_id) {
            session.last_validated_at = at;
        }
        Ok(())
    }

    async fn delete(&self, token_id: &str) -> GateResult<bool> {
        Ok(self.sessions().remove(token_id).is_some())
    }

    async fn sweep_expired(&self) -> GateResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        // Same snapshot-then-remove shape as the attempt sweep
        let candidates: Vec<String> = self
            .sessions()
            .iter()
            .filter(|(_, session)| now_ms >= session.expires_at_ms)
            .map(|(token_id, _)| token_id.clone())
            .collect();

        let mut removed = 0u64;
        for token_id in candidates {
            let mut sessions = self.sessions();
            if sessions
                .get(&token_id)
                .is_some_and(|session| now_ms >= session.expires_at_ms)
            {
                sessions.remove(&token_id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn session_count(&self) -> GateResult<u64> {
        Ok(self.sessions().len() as u64)
    }
}

impl AuditRepository for MemoryGateStore {
    async fn append(&self, event: AuditEvent) -> GateResult<()> {
        self.audit().push(event);
        Ok(())
    }

    async fn query(&self, limit: usize, filter: &AuditFilter) -> GateResult<Vec<AuditEvent>> {
        let audit = self.audit();
        Ok(audit
            .events
            .iter()
            .rev()
            .filter(|event| filter.matches(event))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn audit_len(&self) -> GateResult<u64> {
        Ok(self.audit().events.len() as u64)
    }

    async fn count_by_kind(&self) -> GateResult<Vec<(AuditKind, u64)>> {
        let audit = self.audit();
        Ok(AuditKind::ALL
            .iter()
            .map(|&kind| {
                let count = audit.events.iter().filter(|e| e.kind == kind).count() as u64;
                (kind, count)
            })
            .collect())
    }
}
