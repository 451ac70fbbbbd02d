//! Background Sweep
//!
//! Periodic reclamation of expired sessions, stale attempt records and
//! idle rate windows. Not required for correctness (validation already
//! rejects expired state); it bounds memory growth. Each table is swept
//! under its own short-lived lock, never a whole-scan lock.

use std::sync::Arc;
use std::time::Duration;

use platform::rate_limit::MemoryRateLimitStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::repository::{AttemptRepository, SessionRepository};

/// What one sweep pass removed
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    pub sessions: u64,
    pub attempts: u64,
    pub rate_windows: u64,
}

/// Periodic sweeper over the gate's three tables
pub struct Sweeper<A, S>
where
    A: AttemptRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    attempts: Arc<A>,
    sessions: Arc<S>,
    rate: MemoryRateLimitStore,
    /// Rate windows idle longer than this are dropped
    rate_max_idle: Duration,
}

impl<A, S> Sweeper<A, S>
where
    A: AttemptRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    pub fn new(
        attempts: Arc<A>,
        sessions: Arc<S>,
        rate: MemoryRateLimitStore,
        rate_max_idle: Duration,
    ) -> Self {
        Self {
            attempts,
            sessions,
            rate,
            rate_max_idle,
        }
    }

    /// One deterministic pass; failures are logged and do not stop the
    /// other tables from being swept
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.sessions.sweep_expired().await {
            Ok(count) => report.sessions = count,
            Err(e) => tracing::warn!(error = %e, "Session sweep failed, continuing anyway"),
        }

        match self.attempts.sweep_stale().await {
            Ok(count) => report.attempts = count,
            Err(e) => tracing::warn!(error = %e, "Attempt sweep failed, continuing anyway"),
        }

        report.rate_windows = self.rate.sweep_stale(self.rate_max_idle) as u64;

        report
    }

    /// Spawn the periodic loop; it stops when `shutdown` flips to true or
    /// the sender is dropped
    pub fn spawn(self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.run_once().await;
                        if report.sessions + report.attempts + report.rate_windows > 0 {
                            tracing::info!(
                                sessions_removed = report.sessions,
                                attempts_removed = report.attempts,
                                rate_windows_removed = report.rate_windows,
                                "Sweep completed"
                            );
                        }
                    }
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Sweeper stopped");
        })
    }
}
