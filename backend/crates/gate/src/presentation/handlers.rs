//! HTTP Handlers

use axum::extract::{Extension, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use platform::rate_limit::MemoryRateLimitStore;

use crate::application::{
    AdminGate, EmergencyLockUseCase, GateConfig, LogoutUseCase, ValidateSessionUseCase,
    VerifyPasswordUseCase,
};
use crate::domain::entity::audit_event::{AuditFilter, AuditKind};
use crate::domain::repository::{AttemptRepository, AuditRepository, SessionRepository};
use crate::error::{GateError, GateResult};
use crate::presentation::dto::{
    ConfigResponse, HealthResponse, LockIpRequest, LockIpResponse, LogoutRequest, LogoutResponse,
    SecurityEventsQuery, SecurityEventsResponse, StatsResponse, UnlockIpRequest, UnlockIpResponse,
    ValidateSessionRequest, ValidateSessionResponse, VerifyPasswordRequest, VerifyPasswordResponse,
};
use crate::presentation::middleware::SourceAddr;

/// Hard cap on the number of events one query may return
const MAX_EVENT_QUERY_LIMIT: usize = 1000;
const DEFAULT_EVENT_QUERY_LIMIT: usize = 100;

/// Shared state for gate handlers and middleware
#[derive(Clone)]
pub struct GateAppState<R>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub rate: MemoryRateLimitStore,
    pub admin: Arc<AdminGate>,
    pub config: Arc<GateConfig>,
}

// ============================================================================
// Verify Password
// ============================================================================

/// POST /auth/verify-password
pub async fn verify_password<R>(
    State(state): State<GateAppState<R>>,
    Extension(SourceAddr(addr)): Extension<SourceAddr>,
    Json(req): Json<VerifyPasswordRequest>,
) -> GateResult<Json<VerifyPasswordResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    if req.password.is_empty() {
        return Err(GateError::Validation("password is required".to_string()));
    }

    let use_case = VerifyPasswordUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );

    let output = use_case.execute(&req.password, addr).await?;

    Ok(Json(VerifyPasswordResponse {
        success: true,
        session_token: output.session_token,
        session_id: output.session_id.to_string(),
        expires_at_ms: output.expires_at_ms,
    }))
}

// ============================================================================
// Validate Session
// ============================================================================

/// POST /auth/validate-session
pub async fn validate_session<R>(
    State(state): State<GateAppState<R>>,
    Extension(SourceAddr(addr)): Extension<SourceAddr>,
    Json(req): Json<ValidateSessionRequest>,
) -> GateResult<Json<ValidateSessionResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let use_case = ValidateSessionUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );

    match use_case.execute(&req.session_token, addr).await {
        Ok(info) => Ok(Json(ValidateSessionResponse {
            success: true,
            valid: true,
            session: Some(info.into()),
        })),
        // An invalid session is the answer, not an error
        Err(GateError::SessionInvalid) => Ok(Json(ValidateSessionResponse {
            success: true,
            valid: false,
            session: None,
        })),
        Err(e) => Err(e),
    }
}

// ============================================================================
// Logout
// ============================================================================

/// POST /auth/logout
pub async fn logout<R>(
    State(state): State<GateAppState<R>>,
    Extension(SourceAddr(addr)): Extension<SourceAddr>,
    Json(req): Json<LogoutRequest>,
) -> GateResult<Json<LogoutResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let use_case = LogoutUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());

    let logged_out = use_case.execute(&req.session_token, addr).await?;

    Ok(Json(LogoutResponse {
        success: true,
        logged_out,
    }))
}

// ============================================================================
// Stats (admin)
// ============================================================================

/// GET /auth/stats
pub async fn stats<R>(
    State(state): State<GateAppState<R>>,
) -> GateResult<Json<StatsResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let attempt_stats = state.repo.attempt_stats().await?;
    let active_sessions = state.repo.session_count().await?;
    let audit_events = state.repo.audit_len().await?;
    let events_by_kind: BTreeMap<String, u64> = state
        .repo
        .count_by_kind()
        .await?
        .into_iter()
        .map(|(kind, count)| (kind.as_str().to_string(), count))
        .collect();

    Ok(Json(StatsResponse {
        success: true,
        active_sessions,
        tracked_addresses: attempt_stats.tracked,
        locked_addresses: attempt_stats.locked,
        audit_events,
        events_by_kind,
        rate_windows: state.rate.tracked() as u64,
    }))
}

// ============================================================================
// Security Events (admin)
// ============================================================================

/// GET /auth/security-events
pub async fn security_events<R>(
    State(state): State<GateAppState<R>>,
    Query(query): Query<SecurityEventsQuery>,
) -> GateResult<Json<SecurityEventsResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_QUERY_LIMIT)
        .min(MAX_EVENT_QUERY_LIMIT);

    let kind = query
        .kind
        .as_deref()
        .map(|s| {
            s.parse::<AuditKind>()
                .map_err(|_| GateError::Validation(format!("unknown event type: {s}")))
        })
        .transpose()?;

    let addr = query
        .ip
        .as_deref()
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|_| GateError::Validation(format!("invalid ip: {s}")))
        })
        .transpose()?;

    let start = parse_rfc3339(query.start_date.as_deref(), "startDate")?;
    let end = parse_rfc3339(query.end_date.as_deref(), "endDate")?;

    let filter = AuditFilter {
        kind,
        addr,
        start,
        end,
    };
    let events = state.repo.query(limit, &filter).await?;

    Ok(Json(SecurityEventsResponse {
        success: true,
        count: events.len(),
        events: events.into_iter().map(Into::into).collect(),
    }))
}

fn parse_rfc3339(
    value: Option<&str>,
    param: &str,
) -> GateResult<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| GateError::Validation(format!("{param} must be RFC 3339")))
        })
        .transpose()
}

// ============================================================================
// Emergency Lock / Unlock (admin)
// ============================================================================

/// POST /auth/emergency/lock-ip
pub async fn lock_ip<R>(
    State(state): State<GateAppState<R>>,
    Extension(SourceAddr(admin_addr)): Extension<SourceAddr>,
    Json(req): Json<LockIpRequest>,
) -> GateResult<Json<LockIpResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let target: IpAddr = req
        .ip
        .parse()
        .map_err(|_| GateError::Validation(format!("invalid ip: {}", req.ip)))?;

    let duration = match req.duration_ms {
        Some(0) => {
            return Err(GateError::Validation(
                "durationMs must be positive".to_string(),
            ));
        }
        Some(ms) => Duration::from_millis(ms),
        None => state.config.lockout.lockout_duration,
    };

    let use_case = EmergencyLockUseCase::new(state.repo.clone(), state.repo.clone());
    let until = use_case
        .lock(target, duration, req.reason, admin_addr)
        .await?;

    Ok(Json(LockIpResponse {
        success: true,
        ip: target.to_string(),
        locked_until_ms: until.timestamp_millis(),
    }))
}

/// POST /auth/emergency/unlock-ip
pub async fn unlock_ip<R>(
    State(state): State<GateAppState<R>>,
    Extension(SourceAddr(admin_addr)): Extension<SourceAddr>,
    Json(req): Json<UnlockIpRequest>,
) -> GateResult<Json<UnlockIpResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let target: IpAddr = req
        .ip
        .parse()
        .map_err(|_| GateError::Validation(format!("invalid ip: {}", req.ip)))?;

    let use_case = EmergencyLockUseCase::new(state.repo.clone(), state.repo.clone());
    let was_locked = use_case.unlock(target, admin_addr).await?;

    Ok(Json(UnlockIpResponse {
        success: true,
        ip: target.to_string(),
        was_locked,
    }))
}

// ============================================================================
// Health / Config
// ============================================================================

/// GET /auth/health
pub async fn health<R>(
    State(state): State<GateAppState<R>>,
) -> GateResult<Json<HealthResponse>>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    Ok(Json(HealthResponse {
        success: true,
        status: "ok",
        active_sessions: state.repo.session_count().await?,
        tracked_addresses: state.repo.attempt_stats().await?.tracked,
        audit_events: state.repo.audit_len().await?,
        rate_windows: state.rate.tracked() as u64,
    }))
}

/// GET /auth/config
pub async fn get_config<R>(
    State(state): State<GateAppState<R>>,
) -> Json<ConfigResponse>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let config = &state.config;
    Json(ConfigResponse {
        success: true,
        lockout_threshold: config.lockout.threshold,
        lockout_duration_ms: config.lockout.lockout_duration.as_millis() as u64,
        attempt_window_ms: config.lockout.attempt_window.as_millis() as u64,
        rate_max_requests: config.rate_limit.max_requests,
        rate_window_ms: config.rate_limit.window.as_millis() as u64,
        session_ttl_ms: config.session_ttl_ms(),
        sweep_interval_ms: config.sweep_interval.as_millis() as u64,
        audit_capacity: config.audit_capacity,
        admin_addr_count: state.admin.allow_count(),
    })
}
