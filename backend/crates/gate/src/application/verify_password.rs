//! Verify Password Use Case
//!
//! The login path: rate limiting has already happened at the middleware,
//! so this is lockout check → constant-time comparison → session issue.
//! Every call path appends exactly one audit event.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::GateConfig;
use crate::domain::entity::attempt_record::LockState;
use crate::domain::entity::audit_event::{AuditEvent, AuditKind};
use crate::domain::entity::session::Session;
use crate::domain::repository::{AttemptRepository, AuditRepository, SessionRepository};
use crate::domain::value_object::session_token;
use crate::error::{GateError, GateResult};

/// Verify password output
#[derive(Debug)]
pub struct VerifyPasswordOutput {
    /// Signed session token for the client
    pub session_token: String,
    /// Correlation id (safe to log)
    pub session_id: uuid::Uuid,
    /// Session expiration (Unix timestamp ms)
    pub expires_at_ms: i64,
}

/// Verify password use case
pub struct VerifyPasswordUseCase<A, S, L>
where
    A: AttemptRepository,
    S: SessionRepository,
    L: AuditRepository,
{
    attempts: Arc<A>,
    sessions: Arc<S>,
    audit: Arc<L>,
    config: Arc<GateConfig>,
}

impl<A, S, L> VerifyPasswordUseCase<A, S, L>
where
    A: AttemptRepository,
    S: SessionRepository,
    L: AuditRepository,
{
    pub fn new(attempts: Arc<A>, sessions: Arc<S>, audit: Arc<L>, config: Arc<GateConfig>) -> Self {
        Self {
            attempts,
            sessions,
            audit,
            config,
        }
    }

    pub async fn execute(
        &self,
        password: &str,
        addr: std::net::IpAddr,
    ) -> GateResult<VerifyPasswordOutput> {
        // A locked address is rejected before the secret is examined, so a
        // locked-out guesser gets no timing oracle to keep probing.
        if let LockState::Locked { until } = self.attempts.lock_state(addr).await? {
            let retry_after_ms = (until - Utc::now()).num_milliseconds().max(0);
            self.audit
                .append(
                    AuditEvent::new(AuditKind::AuthFailure, addr)
                        .with_detail(serde_json::json!({ "reason": "locked" })),
                )
                .await?;
            return Err(GateError::Locked { retry_after_ms });
        }

        if !self.config.master_secret.verify(password) {
            return match self.attempts.record_failure(addr).await? {
                LockState::Locked { until } => {
                    self.audit
                        .append(AuditEvent::new(AuditKind::Lockout, addr).with_detail(
                            serde_json::json!({ "lockedUntilMs": until.timestamp_millis() }),
                        ))
                        .await?;
                    tracing::warn!(source_addr = %addr, locked_until = %until, "Address locked out");
                    Err(GateError::Locked {
                        retry_after_ms: (until - Utc::now()).num_milliseconds().max(0),
                    })
                }
                LockState::Open { remaining_attempts } => {
                    self.audit
                        .append(
                            AuditEvent::new(AuditKind::AuthFailure, addr).with_detail(
                                serde_json::json!({ "remainingAttempts": remaining_attempts }),
                            ),
                        )
                        .await?;
                    Err(GateError::InvalidPassword { remaining_attempts })
                }
            };
        }

        // Correct password: clear the failure counter and issue a session
        self.attempts.record_success(addr).await?;

        let minted = session_token::mint(&self.config.token_secret);
        let session = Session::new(minted.token_id, addr, self.config.session_ttl);
        let session_id = session.session_id;
        let expires_at_ms = session.expires_at_ms;

        self.sessions.create(&session).await?;
        self.audit
            .append(
                AuditEvent::new(AuditKind::AuthSuccess, addr)
                    .with_detail(serde_json::json!({ "sessionId": session_id.to_string() })),
            )
            .await?;

        tracing::info!(
            source_addr = %addr,
            session_id = %session_id,
            expires_at_ms,
            "Authentication succeeded"
        );

        Ok(VerifyPasswordOutput {
            session_token: minted.wire,
            session_id,
            expires_at_ms,
        })
    }
}
