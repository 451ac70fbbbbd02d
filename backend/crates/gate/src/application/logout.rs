//! Logout Use Case
//!
//! Eager session invalidation. A later validation of the same token must
//! report it unknown.

use std::net::IpAddr;
use std::sync::Arc;

use crate::application::config::GateConfig;
use crate::domain::entity::audit_event::{AuditEvent, AuditKind};
use crate::domain::repository::{AuditRepository, SessionRepository};
use crate::domain::value_object::session_token;
use crate::error::GateResult;

/// Logout use case
pub struct LogoutUseCase<S, L>
where
    S: SessionRepository,
    L: AuditRepository,
{
    sessions: Arc<S>,
    audit: Arc<L>,
    config: Arc<GateConfig>,
}

impl<S, L> LogoutUseCase<S, L>
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

    /// Invalidate the presented token; returns whether a session was removed
    ///
    /// Unknown or malformed tokens are not an error here, the caller just
    /// learns nothing was logged out.
    pub async fn execute(&self, token: &str, addr: IpAddr) -> GateResult<bool> {
        let Some(token_id) = session_token::parse(token, &self.config.token_secret) else {
            return Ok(false);
        };

        let deleted = self.sessions.delete(&token_id).await?;
        if deleted {
            self.audit
                .append(AuditEvent::new(AuditKind::Logout, addr))
                .await?;
            tracing::info!(source_addr = %addr, "Session logged out");
        }

        Ok(deleted)
    }
}
