//! Validate Session Use Case
//!
//! Verifies a presented token against the session table. The three
//! failure modes (unknown, expired, pinned to another address) collapse
//! into one generic error at the boundary; the precise reason is kept
//! only in the audit log.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;

use crate::application::config::GateConfig;
use crate::domain::entity::audit_event::{AuditEvent, AuditKind};
use crate::domain::entity::session::Session;
use crate::domain::repository::{AuditRepository, SessionRepository};
use crate::domain::value_object::session_token;
use crate::error::{GateError, GateResult};

/// Why validation failed; never surfaces past the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvalidReason {
    NotFound,
    Expired,
    AddressMismatch,
}

impl InvalidReason {
    fn as_str(self) -> &'static str {
        match self {
            InvalidReason::NotFound => "NOT_FOUND",
            InvalidReason::Expired => "EXPIRED",
            InvalidReason::AddressMismatch => "ADDRESS_MISMATCH",
        }
    }
}

/// Session info output (non-sensitive; no token)
pub struct SessionInfoOutput {
    pub session_id: uuid::Uuid,
    pub issued_to: IpAddr,
    pub issued_at_ms: i64,
    pub expires_at_ms: i64,
    pub last_validated_at_ms: i64,
}

impl From<&Session> for SessionInfoOutput {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id,
            issued_to: session.issued_to,
            issued_at_ms: session.issued_at.timestamp_millis(),
            expires_at_ms: session.expires_at_ms,
            last_validated_at_ms: session.last_validated_at.timestamp_millis(),
        }
    }
}

/// Validate session use case
pub struct ValidateSessionUseCase<S, L>
where
    S: SessionRepository,
    L: AuditRepository,
{
    sessions: Arc<S>,
    audit: Arc<L>,
    config: Arc<GateConfig>,
}

impl<S, L> ValidateSessionUseCase<S, L>
where
    S: SessionRepository,
    L: AuditRepository,
{
    pub fn new(sessions: Arc<S>, audit: Arc<L>, config: Arc<GateConfig>) -> Self {
        Self {
            sessions,
            audit,
            config,
        }
    }

    /// Validate a token for the given source address
    pub async fn execute(&self, token: &str, addr: IpAddr) -> GateResult<SessionInfoOutput> {
        // Forged or malformed tokens never reach the table
        let Some(token_id) = session_token::parse(token, &self.config.token_secret) else {
            return self.reject(addr, InvalidReason::NotFound, None).await;
        };

        let Some(session) = self.sessions.find(&token_id).await? else {
            return self.reject(addr, InvalidReason::NotFound, None).await;
        };

        if session.is_expired() {
            // Rejected but not deleted: the sweep reclaims it
            return self
                .reject(addr, InvalidReason::Expired, Some(&session))
                .await;
        }

        if !session.is_pinned_to(addr) {
            // Retained for forensics, just never accepted
            return self
                .reject(addr, InvalidReason::AddressMismatch, Some(&session))
                .await;
        }

        let now = Utc::now();
        self.sessions.touch(&token_id, now).await?;

        let mut session = session;
        session.last_validated_at = now;
        Ok(SessionInfoOutput::from(&session))
    }

    /// Just check whether a token is valid (returns bool)
    pub async fn is_valid(&self, token: &str, addr: IpAddr) -> bool {
        self.execute(token, addr).await.is_ok()
    }

    async fn reject(
        &self,
        addr: IpAddr,
        reason: InvalidReason,
        session: Option<&Session>,
    ) -> GateResult<SessionInfoOutput> {
        let mut detail = serde_json::json!({ "reason": reason.as_str() });
        if let Some(session) = session {
            detail["sessionId"] = session.session_id.to_string().into();
        }
        self.audit
            .append(AuditEvent::new(AuditKind::SessionInvalid, addr).with_detail(detail))
            .await?;

        tracing::warn!(source_addr = %addr, reason = reason.as_str(), "Session validation failed");
        Err(GateError::SessionInvalid)
    }
}
