//! Admin Gate and Emergency Lock Use Case
//!
//! `AdminGate` is a pure allow-list predicate, injected so route guards
//! stay independently testable instead of inline address comparisons
//! repeated per endpoint. It keeps no state and writes no audit events
//! itself; the admin middleware logs denials.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::entity::audit_event::{AuditEvent, AuditKind};
use crate::domain::repository::{AttemptRepository, AuditRepository};
use crate::error::GateResult;

/// Address allow-list for administrative endpoints
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    allow: HashSet<IpAddr>,
}

impl AdminGate {
    pub fn new(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            allow: addrs.into_iter().collect(),
        }
    }

    /// Pure predicate, no state mutation, no audit side effect
    pub fn is_admin(&self, addr: IpAddr) -> bool {
        self.allow.contains(&addr)
    }

    pub fn allow_count(&self) -> usize {
        self.allow.len()
    }
}

/// Manual lock/unlock of source addresses (emergency endpoints)
pub struct EmergencyLockUseCase<A, L>
where
    A: AttemptRepository,
    L: AuditRepository,
{
    attempts: Arc<A>,
    audit: Arc<L>,
}

impl<A, L> EmergencyLockUseCase<A, L>
where
    A: AttemptRepository,
    L: AuditRepository,
{
    pub fn new(attempts: Arc<A>, audit: Arc<L>) -> Self {
        Self { attempts, audit }
    }

    /// Lock `target` for `duration`, recording who asked and why
    pub async fn lock(
        &self,
        target: IpAddr,
        duration: Duration,
        reason: Option<String>,
        admin_addr: IpAddr,
    ) -> GateResult<DateTime<Utc>> {
        let until = self.attempts.manual_lock(target, duration).await?;

        self.audit
            .append(
                AuditEvent::new(AuditKind::ManualLock, target).with_detail(serde_json::json!({
                    "by": admin_addr.to_string(),
                    "reason": reason,
                    "lockedUntilMs": until.timestamp_millis(),
                })),
            )
            .await?;

        tracing::warn!(
            target = %target,
            admin = %admin_addr,
            locked_until = %until,
            "Address manually locked"
        );
        Ok(until)
    }

    /// Clear any lock on `target`; returns whether one was in effect
    pub async fn unlock(&self, target: IpAddr, admin_addr: IpAddr) -> GateResult<bool> {
        let was_locked = self.attempts.manual_unlock(target).await?;

        self.audit
            .append(
                AuditEvent::new(AuditKind::ManualUnlock, target).with_detail(serde_json::json!({
                    "by": admin_addr.to_string(),
                    "wasLocked": was_locked,
                })),
            )
            .await?;

        tracing::info!(target = %target, admin = %admin_addr, was_locked, "Address manually unlocked");
        Ok(was_locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_gate_allow_list() {
        let gate = AdminGate::new(["127.0.0.1".parse().unwrap(), "10.1.0.2".parse().unwrap()]);

        assert!(gate.is_admin("127.0.0.1".parse().unwrap()));
        assert!(gate.is_admin("10.1.0.2".parse().unwrap()));
        assert!(!gate.is_admin("10.0.0.5".parse().unwrap()));
        assert_eq!(gate.allow_count(), 2);
    }

    #[test]
    fn test_admin_gate_empty_denies_all() {
        let gate = AdminGate::default();
        assert!(!gate.is_admin("127.0.0.1".parse().unwrap()));
    }
}
