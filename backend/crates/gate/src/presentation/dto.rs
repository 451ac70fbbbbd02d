//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::SessionInfoOutput;
use crate::domain::entity::audit_event::{AuditEvent, AuditKind};

// ============================================================================
// Verify Password
// ============================================================================

/// Verify password request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordRequest {
    pub password: String,
}

/// Verify password response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordResponse {
    pub success: bool,
    pub session_token: String,
    pub session_id: String,
    pub expires_at_ms: i64,
}

// ============================================================================
// Validate Session
// ============================================================================

/// Validate session request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSessionRequest {
    pub session_token: String,
}

/// Session info on the wire (no token)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub session_id: String,
    pub ip: String,
    pub issued_at_ms: i64,
    pub expires_at_ms: i64,
    pub last_validated_at_ms: i64,
}

impl From<SessionInfoOutput> for SessionDto {
    fn from(info: SessionInfoOutput) -> Self {
        Self {
            session_id: info.session_id.to_string(),
            ip: info.issued_to.to_string(),
            issued_at_ms: info.issued_at_ms,
            expires_at_ms: info.expires_at_ms,
            last_validated_at_ms: info.last_validated_at_ms,
        }
    }
}

/// Validate session response
///
/// An invalid session is not an HTTP error on this endpoint; the caller
/// asked a question and gets `valid: false` as the answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSessionResponse {
    pub success: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDto>,
}

// ============================================================================
// Logout
// ============================================================================

/// Logout request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub session_token: String,
}

/// Logout response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub success: bool,
    pub logged_out: bool,
}

// ============================================================================
// Stats
// ============================================================================

/// Aggregate counters response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub success: bool,
    pub active_sessions: u64,
    pub tracked_addresses: u64,
    pub locked_addresses: u64,
    pub audit_events: u64,
    pub events_by_kind: BTreeMap<String, u64>,
    pub rate_windows: u64,
}

// ============================================================================
// Security Events
// ============================================================================

/// Security events query parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventsQuery {
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub ip: Option<String>,
    /// RFC 3339 lower bound (inclusive)
    pub start_date: Option<String>,
    /// RFC 3339 upper bound (inclusive)
    pub end_date: Option<String>,
}

/// One audit event on the wire
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventDto {
    #[serde(rename = "type")]
    pub kind: AuditKind,
    pub ip: String,
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl From<AuditEvent> for AuditEventDto {
    fn from(event: AuditEvent) -> Self {
        Self {
            kind: event.kind,
            ip: event.source_addr.to_string(),
            timestamp_ms: event.at.timestamp_millis(),
            detail: event.detail,
        }
    }
}

/// Security events response (most recent first)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventsResponse {
    pub success: bool,
    pub count: usize,
    pub events: Vec<AuditEventDto>,
}

// ============================================================================
// Emergency Lock / Unlock
// ============================================================================

/// Emergency lock request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockIpRequest {
    pub ip: String,
    pub reason: Option<String>,
    /// Lock duration in milliseconds; defaults to the lockout duration
    pub duration_ms: Option<u64>,
}

/// Emergency lock response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockIpResponse {
    pub success: bool,
    pub ip: String,
    pub locked_until_ms: i64,
}

/// Emergency unlock request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockIpRequest {
    pub ip: String,
}

/// Emergency unlock response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockIpResponse {
    pub success: bool,
    pub ip: String,
    pub was_locked: bool,
}

// ============================================================================
// Health / Config
// ============================================================================

/// Component health summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
    pub active_sessions: u64,
    pub tracked_addresses: u64,
    pub audit_events: u64,
    pub rate_windows: u64,
}

/// Non-secret configuration echo
///
/// Never includes the master secret, the token key, or the admin
/// addresses themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub success: bool,
    pub lockout_threshold: u32,
    pub lockout_duration_ms: u64,
    pub attempt_window_ms: u64,
    pub rate_max_requests: u32,
    pub rate_window_ms: u64,
    pub session_ttl_ms: i64,
    pub sweep_interval_ms: u64,
    pub audit_capacity: usize,
    pub admin_addr_count: usize,
}
