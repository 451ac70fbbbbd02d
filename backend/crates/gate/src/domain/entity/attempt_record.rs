//! Attempt Record Entity
//!
//! Per-source-address failed-attempt counter with temporary lockout.
//! Pure state + expiry logic; the store decides when to persist.

use chrono::{DateTime, Duration, Utc};

/// Lockout policy knobs, injected from configuration
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Failures within the attempt window before lockout
    pub threshold: u32,
    /// How far back failures still count toward the threshold
    pub attempt_window: std::time::Duration,
    /// How long a triggered lockout lasts
    pub lockout_duration: std::time::Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            attempt_window: std::time::Duration::from_secs(15 * 60),
            lockout_duration: std::time::Duration::from_secs(15 * 60),
        }
    }
}

impl LockoutPolicy {
    fn attempt_window_chrono(&self) -> Duration {
        Duration::milliseconds(self.attempt_window.as_millis() as i64)
    }

    fn lockout_duration_chrono(&self) -> Duration {
        Duration::milliseconds(self.lockout_duration.as_millis() as i64)
    }
}

/// Lock state of a source address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Not locked; this many failures remain before lockout
    Open { remaining_attempts: u32 },
    /// Locked until the given instant
    Locked { until: DateTime<Utc> },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }

    /// Milliseconds until the lock expires, 0 if not locked
    pub fn retry_after_ms(&self, now: DateTime<Utc>) -> i64 {
        match self {
            LockState::Locked { until } => (*until - now).num_milliseconds().max(0),
            LockState::Open { .. } => 0,
        }
    }
}

/// Failed-attempt record for one source address
///
/// Created on first failure, mutated on each subsequent failure,
/// removed entirely on success or by the sweep.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Failures counted within the current attempt window
    pub failed_count: u32,
    /// Start of the current attempt window
    pub first_failure_at: DateTime<Utc>,
    /// Most recent failure
    pub last_failure_at: DateTime<Utc>,
    /// Lockout expiry, if a lockout is in effect
    pub locked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            failed_count: 0,
            first_failure_at: now,
            last_failure_at: now,
            locked_until: None,
        }
    }

    /// Whether a lockout is in effect at `now`
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Whether the failure window has gone stale at `now`
    ///
    /// A stale record no longer contributes to the threshold and may be
    /// swept once any lockout has expired.
    pub fn is_stale_at(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> bool {
        !self.is_locked_at(now) && now - self.last_failure_at > policy.attempt_window_chrono()
    }

    /// Whether the window anchored at the first counted failure has
    /// expired at `now`
    ///
    /// Once it has, the accumulated count no longer applies: every
    /// failure that contributed is older than the attempt window.
    fn window_expired_at(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> bool {
        now - self.first_failure_at > policy.attempt_window_chrono()
    }

    /// Side-effect-free view of the lock state at `now`
    pub fn lock_state_at(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> LockState {
        if let Some(until) = self.locked_until {
            if now < until {
                return LockState::Locked { until };
            }
        }
        let effective = if self.window_expired_at(now, policy) {
            0
        } else {
            self.failed_count
        };
        LockState::Open {
            remaining_attempts: policy.threshold.saturating_sub(effective),
        }
    }

    /// Record one failure at `now` and return the resulting state
    ///
    /// The counter covers a window anchored at the first counted
    /// failure; once that window expires the count starts over from
    /// this failure. A lock therefore requires `threshold` failures
    /// inside one attempt window, and failures spaced wider than the
    /// window never accumulate. An expired lockout is likewise cleared
    /// before counting.
    pub fn record_failure_at(&mut self, now: DateTime<Utc>, policy: &LockoutPolicy) -> LockState {
        if self.locked_until.is_some_and(|until| now >= until) {
            self.locked_until = None;
            self.failed_count = 0;
            self.first_failure_at = now;
        }
        if self.window_expired_at(now, policy) {
            self.failed_count = 0;
            self.first_failure_at = now;
        }

        self.failed_count = self.failed_count.saturating_add(1);
        self.last_failure_at = now;

        if self.failed_count >= policy.threshold {
            let until = now + policy.lockout_duration_chrono();
            self.locked_until = Some(until);
            return LockState::Locked { until };
        }

        LockState::Open {
            remaining_attempts: policy.threshold - self.failed_count,
        }
    }

    /// Apply a manual lock until `now + duration`
    pub fn lock_until(&mut self, until: DateTime<Utc>) {
        self.locked_until = Some(until);
    }

    /// Clear any lockout and the failure counter
    pub fn unlock(&mut self, now: DateTime<Utc>) {
        self.locked_until = None;
        self.failed_count = 0;
        self.first_failure_at = now;
        self.last_failure_at = now;
    }
}
